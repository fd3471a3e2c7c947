// src/recipe/kitchen/layout.rs

//! Package layout and published package metadata

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// The package directory tree
///
/// ```text
/// <root>/
///   bin/<executable>
///   licenses/COPYING
///   licenses/CREDITS
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn licenses_dir(&self) -> PathBuf {
        self.root.join("licenses")
    }

    /// Create the directory skeleton
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(self.bin_dir())?;
        fs::create_dir_all(self.licenses_dir())?;
        Ok(())
    }

    /// Copy license files from `source_dir` into `licenses/`
    pub fn stage_licenses(&self, source_dir: &Path, files: &[String]) -> Result<Vec<PathBuf>> {
        let mut staged = Vec::with_capacity(files.len());
        for name in files {
            let src = source_dir.join(name);
            if !src.is_file() {
                return Err(Error::Packaging(format!(
                    "License file {} not found in {}",
                    name,
                    source_dir.display()
                )));
            }
            let dest = self.licenses_dir().join(name);
            fs::copy(&src, &dest)?;
            debug!("Staged license {}", dest.display());
            staged.push(dest);
        }
        Ok(staged)
    }

    /// Copy every file matching `pattern` into `bin/`
    pub fn stage_binaries(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let paths = glob::glob(pattern)
            .map_err(|e| Error::Packaging(format!("Invalid glob {}: {}", pattern, e)))?;

        let mut staged = Vec::new();
        for entry in paths {
            let src = entry.map_err(|e| Error::Packaging(e.to_string()))?;
            if !src.is_file() {
                continue;
            }
            let Some(name) = src.file_name() else {
                continue;
            };
            let dest = self.bin_dir().join(name);
            fs::copy(&src, &dest)?;
            debug!("Staged binary {}", dest.display());
            staged.push(dest);
        }
        Ok(staged)
    }

    /// Check that the executable and every license file are present
    pub fn verify(&self, executable: &str, license_files: &[String]) -> Result<()> {
        let exe = self.bin_dir().join(executable);
        if !exe.is_file() {
            return Err(Error::Packaging(format!(
                "Expected executable {} was not produced",
                exe.display()
            )));
        }
        for name in license_files {
            if !self.licenses_dir().join(name).is_file() {
                return Err(Error::Packaging(format!("License file {} missing from package", name)));
            }
        }
        Ok(())
    }

    /// All files in the package, relative to the root, sorted
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.path().strip_prefix(&self.root).ok().map(Path::to_path_buf))
            .collect();
        files.sort();
        files
    }

    /// Metadata consumers use to find the package
    pub fn info(&self, root_env: &str) -> PackageInfo {
        PackageInfo {
            root_env: root_env.to_string(),
            root: self.root.clone(),
            path: vec![self.bin_dir()],
        }
    }
}

/// Published package metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Name of the variable holding the package root (e.g. `RAGEL_ROOT`)
    pub root_env: String,
    pub root: PathBuf,
    /// Entries appended to the executable search path
    pub path: Vec<PathBuf>,
}

impl PackageInfo {
    /// POSIX shell lines exporting this metadata
    pub fn shell_exports(&self) -> String {
        let mut out = format!("export {}=\"{}\"\n", self.root_env, self.root.display());
        for entry in &self.path {
            out.push_str(&format!("export PATH=\"$PATH:{}\"\n", entry.display()));
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Parse(e.to_string()))
    }
}
