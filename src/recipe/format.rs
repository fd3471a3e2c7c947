// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files that describe where a package's sources come from,
//! which source edits a platform needs, and what ends up in the package.

use crate::recipe::target::Os;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A complete recipe for building a package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: PackageSection,

    /// Source archive
    pub source: SourceSection,

    /// Source edits, applied in order (`[[patch]]` tables)
    #[serde(default, rename = "patch")]
    pub patches: Vec<PatchSpec>,

    /// Variables for substitution (optional)
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Recipe {
    /// Substitute variables in a string
    ///
    /// Replaces `%(name)s` patterns with their values from:
    /// 1. Built-in variables (version, name)
    /// 2. Custom variables from the [variables] section
    pub fn substitute(&self, template: &str) -> String {
        let mut result = template.to_string();

        result = result.replace("%(version)s", &self.package.version);
        result = result.replace("%(name)s", &self.package.name);

        for (key, value) in &self.variables {
            result = result.replace(&format!("%({})s", key), value);
        }

        result
    }

    /// Get the archive URL with variables substituted
    pub fn archive_url(&self) -> String {
        self.substitute(&self.source.archive)
    }

    /// Get the archive filename from the URL
    pub fn archive_filename(&self) -> String {
        self.archive_url()
            .split('/')
            .next_back()
            .filter(|s| !s.is_empty())
            .unwrap_or("source.tar.gz")
            .to_string()
    }

    /// Name of the top-level directory inside the archive
    ///
    /// Defaults to the archive filename without its `.tar.gz`/`.tgz` suffix.
    pub fn extract_dir(&self) -> String {
        if let Some(dir) = &self.source.extract_dir {
            return self.substitute(dir);
        }
        let filename = self.archive_filename();
        filename
            .strip_suffix(".tar.gz")
            .or_else(|| filename.strip_suffix(".tgz"))
            .unwrap_or(&filename)
            .to_string()
    }

    /// Environment variable that publishes the package root
    pub fn root_env(&self) -> String {
        self.package
            .root_env
            .clone()
            .unwrap_or_else(|| format!("{}_ROOT", self.package.executable.to_uppercase()))
    }

    /// File name of the packaged executable on the given platform
    pub fn executable_name(&self, os: Os) -> String {
        format!("{}{}", self.package.executable, os.exe_suffix())
    }

    /// Patches that apply to the given platform, in declaration order
    pub fn patches_for(&self, os: Os) -> Vec<&PatchSpec> {
        self.patches.iter().filter(|p| p.applies_to(os)).collect()
    }
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name
    pub name: String,

    /// Upstream version
    pub version: String,

    /// Name of the installed executable, without platform suffix
    pub executable: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    /// License identifier (SPDX)
    #[serde(default)]
    pub license: Option<String>,

    /// License files copied from the source tree into `licenses/`
    #[serde(default)]
    pub license_files: Vec<String>,

    /// Environment variable published with the package root
    /// (defaults to `<EXECUTABLE>_ROOT`)
    #[serde(default)]
    pub root_env: Option<String>,
}

/// Source archive section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Archive URL (supports `%(version)s` substitution)
    pub archive: String,

    /// Expected checksum, `sha256:<hex>`
    #[serde(default)]
    pub checksum: Option<String>,

    /// Top-level directory inside the archive
    #[serde(default)]
    pub extract_dir: Option<String>,
}

/// A single search/replace edit on a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    /// Path relative to the source root, `/`-separated
    pub file: String,

    /// Exact text to search for
    pub anchor: String,

    /// Replacement text (empty deletes the anchor)
    #[serde(default)]
    pub replacement: String,

    /// Fail when the anchor is absent
    #[serde(default = "default_required")]
    pub required: bool,

    /// Platforms this edit applies to (empty = all)
    #[serde(default)]
    pub platforms: Vec<Os>,
}

fn default_required() -> bool {
    true
}

impl PatchSpec {
    pub fn applies_to(&self, os: Os) -> bool {
        self.platforms.is_empty() || self.platforms.contains(&os)
    }
}
