// src/cli/mod.rs
//! CLI definitions for ragel-installer
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `cook` - Build and package Ragel for a target
//! - `fetch` - Download and verify the source archive only
//! - `plan` - Show every build command without running it
//! - `info` - Describe the build a target would get
//! - `verify` - Run a packaged ragel with `--version`
//! - `completions` - Generate shell completions

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use ragel_installer::recipe::{Arch, Compiler, CompilerFamily, Os, Runtime, Target};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragel-installer")]
#[command(version)]
#[command(about = "Build the Ragel state machine compiler from source", long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, build and package Ragel
    Cook {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        recipe: RecipeArgs,

        #[command(flatten)]
        build: BuildArgs,

        /// Output directory for packages
        #[arg(short, long, default_value = "packages")]
        output: PathBuf,

        /// Keep build directory after completion (for debugging)
        #[arg(long)]
        keep_builddir: bool,

        /// Skip running the packaged executable afterwards
        #[arg(long)]
        no_verify: bool,
    },

    /// Fetch and verify the source archive without building
    Fetch {
        #[command(flatten)]
        recipe: RecipeArgs,

        #[command(flatten)]
        cache: CacheArgs,

        /// Directory for the archive when no cache is used
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },

    /// Print every build command in order without running any
    Plan {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        recipe: RecipeArgs,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Show the normalized target, strategy, requirements and package id
    Info {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        recipe: RecipeArgs,
    },

    /// Run the packaged executable with --version
    Verify {
        /// Package directory (containing bin/ and licenses/)
        package_dir: PathBuf,

        #[command(flatten)]
        recipe: RecipeArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Target settings; anything omitted is taken from the host
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Operating system (windows, linux, macos)
    #[arg(long)]
    pub os: Option<Os>,

    /// Architecture (x86, x86_64)
    #[arg(long)]
    pub arch: Option<Arch>,

    /// Compiler family (gcc, clang, apple-clang, msvc)
    #[arg(long)]
    pub compiler: Option<CompilerFamily>,

    /// Compiler version
    #[arg(long)]
    pub compiler_version: Option<String>,

    /// MSVC runtime (MT, MTd, MD, MDd)
    #[arg(long)]
    pub runtime: Option<Runtime>,

    /// Threading model sub-setting
    #[arg(long)]
    pub threads: Option<String>,

    /// Exception model sub-setting
    #[arg(long)]
    pub exception: Option<String>,
}

impl TargetArgs {
    /// Build a target descriptor, filling gaps from the host
    pub fn to_target(&self) -> anyhow::Result<Target> {
        let host = Target::host().ok();

        let os = match (self.os, &host) {
            (Some(os), _) => os,
            (None, Some(host)) => host.os,
            (None, None) => anyhow::bail!("cannot detect the host OS; pass --os"),
        };
        let arch = self
            .arch
            .or(host.as_ref().map(|h| h.arch))
            .unwrap_or(Arch::X86_64);
        let family = self.compiler.unwrap_or(match os {
            Os::Windows => CompilerFamily::VisualStudio,
            Os::Linux => CompilerFamily::Gcc,
            Os::Macos => CompilerFamily::AppleClang,
        });

        let mut compiler = Compiler::new(family);
        compiler.version = self.compiler_version.clone();
        compiler.threads = self.threads.clone();
        compiler.exception = self.exception.clone();

        let mut target = Target::new(os, arch, compiler);
        target.runtime = self.runtime;
        Ok(target)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RecipeArgs {
    /// Recipe file to use instead of the built-in Ragel recipe
    #[arg(long)]
    pub recipe: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CacheArgs {
    /// Directory for caching downloaded sources
    #[arg(long)]
    pub source_cache: Option<PathBuf>,

    /// Do not cache downloaded sources
    #[arg(long, conflicts_with = "source_cache")]
    pub no_cache: bool,

    /// Hide the download progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Number of parallel build jobs
    #[arg(short, long)]
    pub jobs: Option<u32>,

    /// Parent directory for temporary build directories
    #[arg(long)]
    pub build_root: Option<PathBuf>,

    /// MSYS2 install root (default: $MSYS_ROOT)
    #[arg(long)]
    pub msys_root: Option<PathBuf>,

    /// MinGW install root (default: $MINGW_HOME)
    #[arg(long)]
    pub mingw_home: Option<PathBuf>,

    /// Visual Studio installation directory (default: located with vswhere)
    #[arg(long)]
    pub vs_install_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cook_target() {
        let cli = Cli::try_parse_from([
            "ragel-installer",
            "cook",
            "--os",
            "windows",
            "--arch",
            "x86",
            "--compiler",
            "msvc",
            "--runtime",
            "MT",
        ])
        .unwrap();

        let Commands::Cook { target, .. } = cli.command else {
            panic!("expected cook");
        };
        let target = target.to_target().unwrap();
        assert_eq!(target.os, Os::Windows);
        assert_eq!(target.arch, Arch::X86);
        assert_eq!(target.compiler.family, CompilerFamily::VisualStudio);
        assert_eq!(target.runtime, Some(Runtime::MT));
    }

    #[test]
    fn test_default_compiler_follows_os() {
        let args = TargetArgs {
            os: Some(Os::Macos),
            ..Default::default()
        };
        assert_eq!(args.to_target().unwrap().compiler.family, CompilerFamily::AppleClang);
    }
}
