// src/recipe/kitchen/environment.rs

//! Scoped build environments
//!
//! A [`BuildEnvironment`] is an explicit value describing the environment a
//! build subprocess sees: a base snapshot, variable overrides, removed
//! variables, search-path prefixes and a working directory. It is applied to
//! each `Command` individually and never written back to the process
//! environment, so nothing a strategy sets survives past the strategy.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Name of the executable search path variable.
///
/// Windows treats variable names case-insensitively; we always emit `PATH`.
pub const PATH_VAR: &str = "PATH";

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvironment {
    /// Variables visible before any override
    base: BTreeMap<String, String>,
    /// Inherited variables that are not valid UTF-8, passed through as-is
    opaque: BTreeMap<OsString, OsString>,
    /// Explicit overrides
    vars: BTreeMap<String, String>,
    /// Variables hidden from the subprocess
    removed: BTreeSet<String>,
    /// Directories placed in front of PATH, first entry searched first
    path_prefix: Vec<PathBuf>,
    cwd: PathBuf,
}

impl BuildEnvironment {
    /// Snapshot the current process environment as the base
    pub fn inherit(cwd: impl Into<PathBuf>) -> Self {
        Self::from_vars_os(std::env::vars_os(), cwd)
    }

    /// Start from raw variables
    ///
    /// Entries that are not valid UTF-8 cannot be read or edited, but still
    /// reach subprocesses unchanged.
    pub fn from_vars_os<I>(vars: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut base = BTreeMap::new();
        let mut opaque = BTreeMap::new();
        for (key, value) in vars {
            match (key.to_str(), value.to_str()) {
                (Some(k), Some(v)) => {
                    base.insert(k.to_string(), v.to_string());
                }
                _ => {
                    debug!("Passing through non-UTF-8 variable {}", key.to_string_lossy());
                    opaque.insert(key, value);
                }
            }
        }
        Self {
            opaque,
            ..Self::with_base(base, cwd)
        }
    }

    /// Start from an explicit base, e.g. a captured toolchain environment
    pub fn with_base(base: BTreeMap<String, String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            base,
            opaque: BTreeMap::new(),
            vars: BTreeMap::new(),
            removed: BTreeSet::new(),
            path_prefix: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// A copy of this environment rooted in another directory
    pub fn in_dir(&self, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..self.clone()
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.removed.remove(&key);
        self.vars.insert(key, value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
        self.removed.insert(key.to_string());
    }

    /// Put a directory at the front of the search path
    pub fn prepend_path(&mut self, dir: impl Into<PathBuf>) {
        self.path_prefix.insert(0, dir.into());
    }

    /// Merge a captured environment (e.g. from vcvars) over the current one
    ///
    /// A captured `PATH` replaces the base search path; prefixes stay in front.
    pub fn overlay(&mut self, captured: &BTreeMap<String, String>) {
        for (key, value) in captured {
            if key.eq_ignore_ascii_case(PATH_VAR) {
                self.set(PATH_VAR, value.clone());
            } else {
                self.set(key.clone(), value.clone());
            }
        }
    }

    /// Look up a variable as the subprocess would see it
    pub fn get(&self, key: &str) -> Option<String> {
        if key.eq_ignore_ascii_case(PATH_VAR) {
            return self.search_path();
        }
        if self.removed.contains(key) {
            return None;
        }
        self.vars
            .get(key)
            .or_else(|| self.base.get(key))
            .cloned()
    }

    pub fn is_removed(&self, key: &str) -> bool {
        self.removed.contains(key)
    }

    fn base_path(&self) -> Option<&String> {
        self.vars.get(PATH_VAR).or_else(|| {
            self.base
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(PATH_VAR))
                .map(|(_, v)| v)
        })
    }

    /// The effective search path: prefixes followed by the base PATH
    pub fn search_path(&self) -> Option<String> {
        let mut parts: Vec<String> = self
            .path_prefix
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        if let Some(base) = self.base_path()
            && !base.is_empty()
        {
            parts.push(base.clone());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(&PATH_SEPARATOR.to_string()))
        }
    }

    /// Variables set or changed relative to the base, sorted by name
    pub fn overrides(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .vars
            .iter()
            .filter(|(k, _)| k.as_str() != PATH_VAR)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !self.path_prefix.is_empty()
            && let Some(path) = self.search_path()
        {
            out.push((PATH_VAR.to_string(), path));
        }
        out
    }

    /// Configure a command to run inside this environment
    pub fn apply(&self, command: &mut Command) {
        command.env_clear();
        for (key, value) in &self.opaque {
            let name = key.to_string_lossy();
            if !self.removed.contains(&*name)
                && !self.vars.contains_key(&*name)
                && !name.eq_ignore_ascii_case(PATH_VAR)
            {
                command.env(key, value);
            }
        }
        for (key, value) in &self.base {
            if !self.removed.contains(key) && !key.eq_ignore_ascii_case(PATH_VAR) {
                command.env(key, value);
            }
        }
        for (key, value) in &self.vars {
            if key != PATH_VAR {
                command.env(key, value);
            }
        }
        if let Some(path) = self.search_path() {
            command.env(PATH_VAR, OsString::from(path));
        }
        command.current_dir(&self.cwd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BTreeMap<String, String> {
        let mut base = BTreeMap::new();
        base.insert("PATH".to_string(), "/usr/bin".to_string());
        base.insert("VisualStudioVersion".to_string(), "14.0".to_string());
        base.insert("HOME".to_string(), "/home/build".to_string());
        base
    }

    #[test]
    fn test_remove_hides_base_variable() {
        let mut env = BuildEnvironment::with_base(base(), "/src");
        assert_eq!(env.get("VisualStudioVersion").as_deref(), Some("14.0"));
        env.remove("VisualStudioVersion");
        assert_eq!(env.get("VisualStudioVersion"), None);
        assert!(env.is_removed("VisualStudioVersion"));
        assert_eq!(env.get("HOME").as_deref(), Some("/home/build"));
    }

    #[test]
    fn test_set_after_remove_restores() {
        let mut env = BuildEnvironment::with_base(base(), "/src");
        env.remove("MSYS_ROOT");
        env.set("MSYS_ROOT", "C:/msys64");
        assert_eq!(env.get("MSYS_ROOT").as_deref(), Some("C:/msys64"));
    }

    #[test]
    fn test_prepend_path_order() {
        let mut env = BuildEnvironment::with_base(base(), "/src");
        env.prepend_path("/opt/b");
        env.prepend_path("/opt/a");
        let sep = PATH_SEPARATOR;
        assert_eq!(
            env.search_path().unwrap(),
            format!("/opt/a{sep}/opt/b{sep}/usr/bin")
        );
        assert_eq!(env.get("PATH"), env.search_path());
    }

    #[test]
    fn test_overlay_replaces_base_path() {
        let mut env = BuildEnvironment::with_base(base(), "/src");
        env.prepend_path("/msys/usr/bin");
        let mut captured = BTreeMap::new();
        captured.insert("Path".to_string(), "/vc/bin".to_string());
        captured.insert("INCLUDE".to_string(), "/vc/include".to_string());
        env.overlay(&captured);

        assert_eq!(
            env.search_path().unwrap(),
            format!("/msys/usr/bin{}/vc/bin", PATH_SEPARATOR)
        );
        assert_eq!(env.get("INCLUDE").as_deref(), Some("/vc/include"));
    }

    #[test]
    fn test_in_dir_keeps_variables() {
        let mut env = BuildEnvironment::with_base(base(), "/src");
        env.set("CC", "cl");
        let sub = env.in_dir("/src/ragel");
        assert_eq!(sub.cwd(), Path::new("/src/ragel"));
        assert_eq!(sub.get("CC").as_deref(), Some("cl"));
    }

    #[test]
    fn test_base_is_not_the_process_environment() {
        let env = BuildEnvironment::with_base(BTreeMap::new(), "/src");
        assert_eq!(env.get("HOME"), None);
        assert_eq!(env.search_path(), None);
    }

    #[test]
    fn test_overrides_lists_changes_only() {
        let mut env = BuildEnvironment::with_base(base(), "/src");
        env.set("CC", "gcc");
        env.prepend_path("/tools");
        let overrides = env.overrides();
        assert_eq!(overrides[0], ("CC".to_string(), "gcc".to_string()));
        assert_eq!(overrides[1].0, "PATH");
        assert_eq!(overrides.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variables_pass_through() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStringExt;

        let latin1 = OsString::from_vec(b"caf\xe9".to_vec());
        let vars = vec![
            (OsString::from("PATH"), OsString::from("/usr/bin")),
            (OsString::from("LATIN1"), latin1.clone()),
            (OsString::from("HIDDEN"), latin1.clone()),
        ];
        let mut env = BuildEnvironment::from_vars_os(vars, "/src");
        env.remove("HIDDEN");
        assert_eq!(env.search_path().as_deref(), Some("/usr/bin"));
        assert_eq!(env.get("LATIN1"), None);

        let mut command = Command::new("true");
        env.apply(&mut command);
        let envs: Vec<_> = command.get_envs().collect();
        assert!(envs.contains(&(OsStr::new("LATIN1"), Some(latin1.as_os_str()))));
        assert!(envs.iter().all(|(k, _)| *k != OsStr::new("HIDDEN")));
    }

    #[test]
    fn test_inherit_snapshots_process_environment() {
        let env = BuildEnvironment::inherit("/src");
        assert_eq!(env.cwd(), Path::new("/src"));
        assert_eq!(env.get("PATH"), std::env::var("PATH").ok().filter(|p| !p.is_empty()));
    }
}
