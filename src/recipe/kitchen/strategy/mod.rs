// src/recipe/kitchen/strategy/mod.rs

//! Build strategies
//!
//! A strategy turns an extracted source tree into an installed tree. Which
//! one runs is decided by a single table keyed by `(os, compiler family)`;
//! there is no other platform branching in the Kitchen.

mod msvc;
mod unix;
mod windows;

pub use msvc::{compiler_flags, linker_flags, machine_flag, parse_set_output, preprocessor_flags};
pub use unix::UnixStrategy;
pub use windows::{WindowsStrategy, WindowsToolchain};

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::recipe::kitchen::environment::BuildEnvironment;
use crate::recipe::kitchen::layout::PackageLayout;
use crate::recipe::kitchen::requirements::ResolvedRequirements;
use crate::recipe::kitchen::runner::{CommandOutput, CommandRunner, Invocation};
use crate::recipe::target::{CompilerFamily, Os, Target};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use strum_macros::Display;
use tracing::info;

/// The two ways of building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StrategyKind {
    #[strum(to_string = "unix")]
    Unix,
    #[strum(to_string = "windows")]
    Windows,
}

/// Look up the strategy for a target
pub fn select_strategy(target: &Target) -> Result<StrategyKind> {
    use CompilerFamily::*;

    match (target.os, target.compiler.family) {
        (Os::Linux, Gcc | Clang) => Ok(StrategyKind::Unix),
        (Os::Macos, AppleClang | Clang | Gcc) => Ok(StrategyKind::Unix),
        (Os::Windows, VisualStudio | Gcc) => Ok(StrategyKind::Windows),
        (os, family) => Err(Error::UnsupportedTarget(format!(
            "no build strategy for {} with {}",
            os, family
        ))),
    }
}

/// Instantiate the strategy for a target
pub fn strategy_for(target: &Target) -> Result<Box<dyn BuildStrategy>> {
    Ok(match select_strategy(target)? {
        StrategyKind::Unix => Box::new(UnixStrategy::new()),
        StrategyKind::Windows => {
            let toolchain = if target.compiler.family == CompilerFamily::Gcc {
                WindowsToolchain::MinGw
            } else {
                WindowsToolchain::Msvc
            };
            Box::new(WindowsStrategy::new(toolchain))
        }
    })
}

/// A build strategy
///
/// The Cook calls `configure`, `build` and `package` once each, in that
/// order. State carried between the calls (such as the build environment)
/// lives in the strategy value.
pub trait BuildStrategy {
    fn kind(&self) -> StrategyKind;

    /// Prepare the source tree and run the configure script
    fn configure(&mut self, ctx: &BuildContext<'_>) -> Result<()>;

    /// Compile
    fn build(&mut self, ctx: &BuildContext<'_>) -> Result<()>;

    /// Put the executable into the package layout's `bin/`
    fn package(&mut self, ctx: &BuildContext<'_>) -> Result<()>;
}

/// Everything a strategy may look at
pub struct BuildContext<'a> {
    pub recipe: &'a Recipe,
    pub target: &'a Target,
    /// Extracted and renamed source tree
    pub source_dir: &'a Path,
    /// Install prefix for builds that stage before packaging
    pub staging_dir: &'a Path,
    pub layout: &'a PackageLayout,
    pub requirements: &'a ResolvedRequirements,
    /// Environment every strategy starts from
    pub base_env: &'a BuildEnvironment,
    pub runner: &'a dyn CommandRunner,
    pub jobs: u32,
    /// Explicit Visual Studio installation, bypassing vswhere
    pub vs_install_dir: Option<&'a Path>,
    pub log: &'a RefCell<String>,
}

impl BuildContext<'_> {
    /// Run one step, appending its command line and output to the build log
    pub fn run(&self, invocation: Invocation) -> Result<CommandOutput> {
        info!("Running {} step", invocation.step);
        self.append_log(&format!("=== {} ===\n$ {}\n", invocation.step, invocation.command_line()));

        match self.runner.run(&invocation) {
            Ok(output) => {
                self.append_log(&output.stdout);
                self.append_log(&output.stderr);
                Ok(output)
            }
            Err(e) => {
                self.append_log(&format!("{}\n", e));
                Err(e)
            }
        }
    }

    pub fn append_log(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut log = self.log.borrow_mut();
        log.push_str(text);
        if !text.ends_with('\n') {
            log.push('\n');
        }
    }

    /// Path to the executable inside the package layout
    pub fn packaged_executable(&self) -> PathBuf {
        self.layout
            .bin_dir()
            .join(self.recipe.executable_name(self.target.os))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::target::{Arch, Compiler};
    use strum::IntoEnumIterator;

    #[test]
    fn test_table_is_exclusive() {
        for os in Os::iter() {
            for family in CompilerFamily::iter() {
                let target = Target::new(os, Arch::X86_64, Compiler::new(family));
                match select_strategy(&target) {
                    Ok(StrategyKind::Windows) => assert_eq!(os, Os::Windows),
                    Ok(StrategyKind::Unix) => assert_ne!(os, Os::Windows),
                    Err(e) => assert!(matches!(e, Error::UnsupportedTarget(_))),
                }
            }
        }
    }

    #[test]
    fn test_scenario_targets() {
        let linux = Target::new(Os::Linux, Arch::X86_64, Compiler::new(CompilerFamily::Gcc));
        assert_eq!(select_strategy(&linux).unwrap(), StrategyKind::Unix);

        let msvc = Target::new(
            Os::Windows,
            Arch::X86,
            Compiler::new(CompilerFamily::VisualStudio),
        );
        assert_eq!(select_strategy(&msvc).unwrap(), StrategyKind::Windows);
        assert_eq!(strategy_for(&msvc).unwrap().kind(), StrategyKind::Windows);
    }

    #[test]
    fn test_unsupported_combinations() {
        let vs_on_linux = Target::new(
            Os::Linux,
            Arch::X86_64,
            Compiler::new(CompilerFamily::VisualStudio),
        );
        assert!(matches!(
            select_strategy(&vs_on_linux),
            Err(Error::UnsupportedTarget(_))
        ));

        let apple_on_windows = Target::new(
            Os::Windows,
            Arch::X86_64,
            Compiler::new(CompilerFamily::AppleClang),
        );
        assert!(select_strategy(&apple_on_windows).is_err());
    }
}
