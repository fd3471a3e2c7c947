// src/recipe/target.rs

//! Target descriptors: the platform settings a recipe is cooked for
//!
//! A [`Target`] names the operating system, architecture, compiler and (for
//! Visual Studio) the C runtime linkage. It is read-only once
//! [`Target::normalize`] has run; the normalized form is what the package id
//! is computed from.

use crate::error::{Error, Result};
use crate::hash::{HashAlgorithm, Hasher};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Operating system of the build
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Linux,
    #[strum(to_string = "Macos", serialize = "macos", serialize = "darwin")]
    Macos,
}

impl Os {
    /// Executable file suffix on this platform
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux | Self::Macos => "",
        }
    }
}

/// CPU architecture of the build
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    #[strum(to_string = "x86", serialize = "i686", serialize = "i386")]
    X86,
    #[strum(to_string = "x86_64", serialize = "amd64", serialize = "x64")]
    X86_64,
}

/// Compiler family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    #[strum(to_string = "gcc", serialize = "mingw")]
    Gcc,
    #[strum(to_string = "clang")]
    Clang,
    #[strum(to_string = "apple-clang")]
    AppleClang,
    #[strum(
        to_string = "Visual Studio",
        serialize = "msvc",
        serialize = "visual-studio",
        serialize = "vs"
    )]
    VisualStudio,
}

impl CompilerFamily {
    /// Whether the compiled ABI is independent of the threading and exception
    /// sub-settings. True for every family but Visual Studio; on Windows the
    /// settings are kept regardless, since MinGW gcc varies on them.
    pub fn has_fixed_abi(&self) -> bool {
        !matches!(self, Self::VisualStudio)
    }
}

/// MSVC C runtime linkage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Runtime {
    MT,
    #[strum(to_string = "MTd")]
    MTd,
    MD,
    #[strum(to_string = "MDd")]
    MDd,
}

impl Runtime {
    /// Compiler flag selecting this runtime (`-MT`, `-MDd`, ...)
    pub fn flag(&self) -> String {
        format!("-{}", self)
    }
}

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compiler {
    pub family: CompilerFamily,
    /// Compiler version as reported by the caller (e.g. "15", "9.3")
    #[serde(default)]
    pub version: Option<String>,
    /// Threading model sub-setting (MinGW: posix, win32)
    #[serde(default)]
    pub threads: Option<String>,
    /// Exception model sub-setting (MinGW: seh, sjlj, dwarf2)
    #[serde(default)]
    pub exception: Option<String>,
}

impl Compiler {
    pub fn new(family: CompilerFamily) -> Self {
        Self {
            family,
            version: None,
            threads: None,
            exception: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Target descriptor for one recipe run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub os: Os,
    pub arch: Arch,
    pub compiler: Compiler,
    /// C runtime linkage (Visual Studio only)
    #[serde(default)]
    pub runtime: Option<Runtime>,
}

impl Target {
    pub fn new(os: Os, arch: Arch, compiler: Compiler) -> Self {
        Self {
            os,
            arch,
            compiler,
            runtime: None,
        }
    }

    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Describe the machine we are running on, with its customary compiler
    pub fn host() -> Result<Self> {
        let os = match std::env::consts::OS {
            "windows" => Os::Windows,
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            other => return Err(Error::UnsupportedTarget(format!("host OS {}", other))),
        };
        let arch = match std::env::consts::ARCH {
            "x86" => Arch::X86,
            "x86_64" => Arch::X86_64,
            other => {
                return Err(Error::UnsupportedTarget(format!(
                    "host architecture {}",
                    other
                )));
            }
        };
        let family = match os {
            Os::Windows => CompilerFamily::VisualStudio,
            Os::Linux => CompilerFamily::Gcc,
            Os::Macos => CompilerFamily::AppleClang,
        };
        Ok(Self::new(os, arch, Compiler::new(family)))
    }

    /// Normalize settings in place
    ///
    /// On non-Windows hosts the threading and exception sub-settings do not
    /// change the produced binary, so they are erased; builds that differ only
    /// in them share a package id. Visual Studio targets get the static `MT`
    /// runtime when none is given.
    pub fn normalize(&mut self) -> Result<()> {
        if self.os != Os::Windows && self.compiler.family.has_fixed_abi() {
            self.compiler.threads = None;
            self.compiler.exception = None;
        }

        match (self.compiler.family, self.runtime) {
            (CompilerFamily::VisualStudio, None) => {
                self.runtime = Some(Runtime::MT);
            }
            (CompilerFamily::VisualStudio, Some(_)) => {}
            (family, Some(runtime)) => {
                return Err(Error::Config(format!(
                    "runtime {} only applies to Visual Studio, not {}",
                    runtime, family
                )));
            }
            (_, None) => {}
        }

        Ok(())
    }

    /// Content id of a build for this target
    ///
    /// Two targets with equal normalized settings get the same id for the same
    /// package name and version.
    pub fn package_id(&self, name: &str, version: &str) -> String {
        let mut hasher = Hasher::new(HashAlgorithm::Xxh128);
        let mut field = |key: &str, value: &str| {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        };

        field("name", name);
        field("version", version);
        field("os", &self.os.to_string());
        field("arch", &self.arch.to_string());
        field("compiler", &self.compiler.family.to_string());
        field("compiler.version", self.compiler.version.as_deref().unwrap_or(""));
        field("compiler.threads", self.compiler.threads.as_deref().unwrap_or(""));
        field("compiler.exception", self.compiler.exception.as_deref().unwrap_or(""));
        field(
            "compiler.runtime",
            &self.runtime.map(|r| r.to_string()).unwrap_or_default(),
        );

        hasher.finalize().value
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.os, self.arch, self.compiler.family)?;
        if let Some(version) = &self.compiler.version {
            write!(f, " {}", version)?;
        }
        if let Some(runtime) = self.runtime {
            write!(f, " ({})", runtime)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn mingw_like(os: Os) -> Target {
        let mut compiler = Compiler::new(CompilerFamily::Gcc).with_version("9");
        compiler.threads = Some("posix".to_string());
        compiler.exception = Some("seh".to_string());
        Target::new(os, Arch::X86_64, compiler)
    }

    #[test]
    fn test_parse_settings() {
        assert_eq!("windows".parse::<Os>().unwrap(), Os::Windows);
        assert_eq!("Linux".parse::<Os>().unwrap(), Os::Linux);
        assert_eq!("darwin".parse::<Os>().unwrap(), Os::Macos);
        assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("x86".parse::<Arch>().unwrap(), Arch::X86);
        assert_eq!(
            "Visual Studio".parse::<CompilerFamily>().unwrap(),
            CompilerFamily::VisualStudio
        );
        assert_eq!("msvc".parse::<CompilerFamily>().unwrap(), CompilerFamily::VisualStudio);
        assert_eq!("mt".parse::<Runtime>().unwrap(), Runtime::MT);
        assert_eq!("MDd".parse::<Runtime>().unwrap(), Runtime::MDd);
        assert!("sparc".parse::<Arch>().is_err());
    }

    #[test]
    fn test_runtime_flag() {
        assert_eq!(Runtime::MT.flag(), "-MT");
        assert_eq!(Runtime::MDd.flag(), "-MDd");
    }

    #[test]
    fn test_normalize_erases_subsettings_off_windows() {
        let mut target = mingw_like(Os::Linux);
        target.normalize().unwrap();
        assert_eq!(target.compiler.threads, None);
        assert_eq!(target.compiler.exception, None);
    }

    #[test]
    fn test_only_visual_studio_abi_varies() {
        for family in CompilerFamily::iter() {
            assert_eq!(
                family.has_fixed_abi(),
                family != CompilerFamily::VisualStudio,
                "{}",
                family
            );
        }
    }

    #[test]
    fn test_normalize_keeps_subsettings_on_windows() {
        let mut target = mingw_like(Os::Windows);
        target.normalize().unwrap();
        assert_eq!(target.compiler.threads.as_deref(), Some("posix"));
        assert_eq!(target.compiler.exception.as_deref(), Some("seh"));
    }

    #[test]
    fn test_package_id_ignores_erased_subsettings() {
        let mut a = mingw_like(Os::Linux);
        let mut b = mingw_like(Os::Linux);
        b.compiler.threads = Some("win32".to_string());
        b.compiler.exception = Some("sjlj".to_string());

        assert_ne!(a.package_id("ragel", "6.10"), b.package_id("ragel", "6.10"));
        a.normalize().unwrap();
        b.normalize().unwrap();
        assert_eq!(a.package_id("ragel", "6.10"), b.package_id("ragel", "6.10"));
    }

    #[test]
    fn test_package_id_distinguishes_arch() {
        let x64 = Target::new(Os::Linux, Arch::X86_64, Compiler::new(CompilerFamily::Gcc));
        let x86 = Target::new(Os::Linux, Arch::X86, Compiler::new(CompilerFamily::Gcc));
        assert_ne!(x64.package_id("ragel", "6.10"), x86.package_id("ragel", "6.10"));
    }

    #[test]
    fn test_normalize_defaults_msvc_runtime() {
        let mut target = Target::new(
            Os::Windows,
            Arch::X86_64,
            Compiler::new(CompilerFamily::VisualStudio),
        );
        target.normalize().unwrap();
        assert_eq!(target.runtime, Some(Runtime::MT));
    }

    #[test]
    fn test_normalize_rejects_runtime_for_gcc() {
        let mut target = Target::new(Os::Linux, Arch::X86_64, Compiler::new(CompilerFamily::Gcc))
            .with_runtime(Runtime::MT);
        assert!(matches!(target.normalize(), Err(Error::Config(_))));
    }

    #[test]
    fn test_display() {
        let target = Target::new(
            Os::Windows,
            Arch::X86,
            Compiler::new(CompilerFamily::VisualStudio).with_version("15"),
        )
        .with_runtime(Runtime::MT);
        assert_eq!(target.to_string(), "Windows/x86/Visual Studio 15 (MT)");
    }
}
