// src/recipe/kitchen/patch.rs

//! Declarative source edits
//!
//! A [`PatchSet`] is applied in two passes: every edit is computed in memory
//! first, and files are only written once all required anchors were found.
//! New contents go to temporary files beside their targets, which are renamed
//! into place only after every one of them was written. A missing anchor or a
//! failed write therefore leaves the source tree untouched.

use crate::error::{Error, Result};
use crate::recipe::format::PatchSpec;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Outcome of applying a patch set
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Files rewritten, relative to the source root
    pub modified: Vec<String>,
    /// Optional edits whose anchor was absent
    pub skipped: Vec<String>,
}

/// An ordered set of search/replace edits
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    edits: Vec<PatchSpec>,
}

impl PatchSet {
    pub fn new<'a>(edits: impl IntoIterator<Item = &'a PatchSpec>) -> Self {
        Self {
            edits: edits.into_iter().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply all edits under `source_dir`
    pub fn apply(&self, source_dir: &Path) -> Result<PatchReport> {
        // file -> (path, original, working copy); BTreeMap keeps write order stable
        let mut staged: BTreeMap<String, (PathBuf, String, String)> = BTreeMap::new();
        let mut report = PatchReport::default();

        for edit in &self.edits {
            if !staged.contains_key(&edit.file) {
                let path = resolve(source_dir, &edit.file);
                let content = match fs::read_to_string(&path) {
                    Ok(content) => content,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound && !edit.required => {
                        warn!("Optional patch target {} does not exist", edit.file);
                        report.skipped.push(edit.file.clone());
                        continue;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(Error::PatchNotFound {
                            file: edit.file.clone(),
                            anchor: edit.anchor.clone(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                };
                staged.insert(edit.file.clone(), (path, content.clone(), content));
            }

            let Some((_, _, content)) = staged.get_mut(&edit.file) else {
                continue;
            };

            if content.contains(&edit.anchor) {
                *content = content.replace(&edit.anchor, &edit.replacement);
                debug!("Patched {}: {:?}", edit.file, edit.anchor);
            } else if edit.required {
                return Err(Error::PatchNotFound {
                    file: edit.file.clone(),
                    anchor: edit.anchor.clone(),
                });
            } else {
                warn!("Optional patch anchor not found in {}: {:?}", edit.file, edit.anchor);
                report.skipped.push(edit.file.clone());
            }
        }

        let changes = staged
            .into_iter()
            .filter(|(_, (_, original, content))| original != content)
            .map(|(file, (path, _, content))| (file, path, content))
            .collect();
        report.modified = commit(changes)?;

        Ok(report)
    }
}

/// Write every change to a temporary sibling, then rename them all into place
fn commit(changes: Vec<(String, PathBuf, String)>) -> Result<Vec<String>> {
    let mut pending = Vec::with_capacity(changes.len());
    for (file, path, content) in changes {
        let parent = path.parent().unwrap_or(Path::new("."));
        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(content.as_bytes())?;
        fs::set_permissions(temp.path(), fs::metadata(&path)?.permissions())?;
        pending.push((file, path, temp));
    }

    let mut modified = Vec::with_capacity(pending.len());
    for (file, path, temp) in pending {
        temp.persist(&path).map_err(|e| e.error)?;
        info!("Applied source patch to {}", file);
        modified.push(file);
    }
    Ok(modified)
}

fn resolve(source_dir: &Path, file: &str) -> PathBuf {
    file.split('/')
        .filter(|c| !c.is_empty())
        .fold(source_dir.to_path_buf(), |acc, c| acc.join(c))
}
