// src/recipe/kitchen/requirements.rs

//! Build requirements for recipe builds
//!
//! Windows builds need an MSYS2 shell environment (and a MinGW toolchain when
//! compiling with gcc). The Kitchen only declares these; a
//! [`RequirementProvider`] maps each declaration to an install root.

use crate::recipe::target::{CompilerFamily, Os, Target};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const MSYS2: &str = "msys2_installer";
pub const MINGW: &str = "mingw_installer";

/// A tool the build needs before it can run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequirement {
    pub name: &'static str,
    pub version: &'static str,
    /// Environment variable conventionally pointing at its install root
    pub root_env: &'static str,
}

impl fmt::Display for BuildRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Declare the requirements of a build for `target`
pub fn declare_build_requirements(target: &Target) -> Vec<BuildRequirement> {
    let mut requirements = Vec::new();
    if target.os != Os::Windows {
        return requirements;
    }

    requirements.push(BuildRequirement {
        name: MSYS2,
        version: "20190524",
        root_env: "MSYS_ROOT",
    });
    if target.compiler.family == CompilerFamily::Gcc {
        requirements.push(BuildRequirement {
            name: MINGW,
            version: "1.0",
            root_env: "MINGW_HOME",
        });
    }
    requirements
}

/// Resolves build requirements to install roots
///
/// This keeps the Kitchen decoupled from however the tools were provisioned.
pub trait RequirementProvider: Send + Sync {
    /// Install root of `requirement`, or `None` if it is not available
    fn resolve(&self, requirement: &BuildRequirement) -> Option<PathBuf>;
}

/// Provider backed by explicit paths, then the environment
///
/// Explicit paths win; otherwise the requirement's `root_env` variable is
/// read from the process environment.
#[derive(Debug, Default, Clone)]
pub struct EnvProvider {
    explicit: BTreeMap<String, PathBuf>,
    read_env: bool,
}

impl EnvProvider {
    pub fn new() -> Self {
        Self {
            explicit: BTreeMap::new(),
            read_env: true,
        }
    }

    /// A provider that never consults the process environment
    pub fn isolated() -> Self {
        Self {
            explicit: BTreeMap::new(),
            read_env: false,
        }
    }

    pub fn with_root(mut self, name: &str, root: impl Into<PathBuf>) -> Self {
        self.explicit.insert(name.to_string(), root.into());
        self
    }
}

impl RequirementProvider for EnvProvider {
    fn resolve(&self, requirement: &BuildRequirement) -> Option<PathBuf> {
        if let Some(root) = self.explicit.get(requirement.name) {
            return Some(root.clone());
        }
        if !self.read_env {
            return None;
        }
        std::env::var_os(requirement.root_env)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}

/// Requirement roots resolved for one run
#[derive(Debug, Default, Clone)]
pub struct ResolvedRequirements {
    pub resolved: BTreeMap<String, PathBuf>,
    pub unresolved: Vec<String>,
}

impl ResolvedRequirements {
    pub fn resolve(requirements: &[BuildRequirement], provider: &dyn RequirementProvider) -> Self {
        let mut result = Self::default();
        for requirement in requirements {
            match provider.resolve(requirement) {
                Some(root) => {
                    debug!("{} resolved to {}", requirement, root.display());
                    result.resolved.insert(requirement.name.to_string(), root);
                }
                None => {
                    warn!("Build requirement {} is not provisioned", requirement);
                    result.unresolved.push(requirement.name.to_string());
                }
            }
        }
        result
    }

    pub fn root(&self, name: &str) -> Option<&PathBuf> {
        self.resolved.get(name)
    }
}
