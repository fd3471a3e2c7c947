// src/recipe/kitchen/strategy/windows.rs

//! Windows build through MSYS2 autotools, with MSVC or MinGW
//!
//! The step order matters: source patches must land before the autotools
//! files are regenerated, and the toolchain environment must be captured
//! before configure runs.

use super::msvc;
use super::{BuildContext, BuildStrategy, StrategyKind};
use crate::error::{Error, Result};
use crate::recipe::kitchen::environment::BuildEnvironment;
use crate::recipe::kitchen::patch::PatchSet;
use crate::recipe::kitchen::requirements::{MINGW, MSYS2};
use crate::recipe::kitchen::runner::Invocation;
use crate::recipe::target::{Os, Runtime};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const AUTORECONF: &str = "aclocal && autoheader && automake --foreign --add-missing && autoconf";

/// Compiler driving a Windows build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowsToolchain {
    Msvc,
    MinGw,
}

#[derive(Debug)]
pub struct WindowsStrategy {
    toolchain: WindowsToolchain,
    /// Environment built during configure, reused by build
    env: Option<BuildEnvironment>,
    bash: Option<PathBuf>,
}

impl WindowsStrategy {
    pub fn new(toolchain: WindowsToolchain) -> Self {
        Self {
            toolchain,
            env: None,
            bash: None,
        }
    }

    pub fn toolchain(&self) -> WindowsToolchain {
        self.toolchain
    }

    fn prepared(&self) -> Result<(&BuildEnvironment, &Path)> {
        match (&self.env, &self.bash) {
            (Some(env), Some(bash)) => Ok((env, bash.as_path())),
            _ => Err(Error::InvalidState {
                expected: "configured windows build".to_string(),
                found: "unconfigured".to_string(),
            }),
        }
    }
}

/// Forward-slash form of a path, as MSYS2 bash expects in scripts
pub(crate) fn unix_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Single-quote a value for bash
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Root of a requirement: the resolved declaration, then the environment
fn requirement_root(
    ctx: &BuildContext<'_>,
    env: &BuildEnvironment,
    name: &str,
    var: &str,
) -> Result<PathBuf> {
    if let Some(root) = ctx.requirements.root(name) {
        return Ok(root.clone());
    }
    match env.get(var).filter(|v| !v.is_empty()) {
        Some(root) => Ok(PathBuf::from(root)),
        None => Err(Error::Environment(format!(
            "{} is required for Windows builds; set {} or provide its install root",
            name, var
        ))),
    }
}

fn locate_bash(msys_bin: &Path, cwd: &Path) -> PathBuf {
    which::which_in("bash", Some(msys_bin), cwd).unwrap_or_else(|_| msys_bin.join("bash.exe"))
}

impl BuildStrategy for WindowsStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Windows
    }

    fn configure(&mut self, ctx: &BuildContext<'_>) -> Result<()> {
        let mut env = ctx.base_env.in_dir(ctx.source_dir);

        // A stale VisualStudioVersion confuses vcvarsall.bat
        env.remove("VisualStudioVersion");

        let msys_root = requirement_root(ctx, &env, MSYS2, "MSYS_ROOT")?;
        let mingw_home = match self.toolchain {
            WindowsToolchain::MinGw => Some(requirement_root(ctx, &env, MINGW, "MINGW_HOME")?),
            WindowsToolchain::Msvc => None,
        };

        let msys_bin = msys_root.join("usr").join("bin");
        env.prepend_path(&msys_bin);
        if let Some(home) = &mingw_home {
            env.prepend_path(home.join("bin"));
        }
        env.set("MSYS_ROOT", msys_root.to_string_lossy());
        let bash = locate_bash(&msys_bin, ctx.source_dir);
        debug!("Using bash at {}", bash.display());

        let patches = PatchSet::new(ctx.recipe.patches_for(Os::Windows));
        if !patches.is_empty() {
            let report = patches.apply(ctx.source_dir)?;
            ctx.append_log(&format!(
                "=== patch ===\nmodified: {}\n",
                report.modified.join(", ")
            ));
            info!("Patched {} file(s)", report.modified.len());
        }

        ctx.run(
            Invocation::new("autoreconf", &bash, &env)
                .arg("-c")
                .arg(AUTORECONF),
        )?;

        let prefix = format!("--prefix={}", unix_path(ctx.staging_dir));
        let mut script = String::from("./configure");
        match self.toolchain {
            WindowsToolchain::Msvc => {
                let runtime = ctx.target.runtime.unwrap_or(Runtime::MT);
                let captured = msvc::capture_vcvars(ctx, &env, ctx.target.arch)?;
                env.overlay(&captured);

                let vars = msvc::configure_variables(ctx.source_dir, ctx.target.arch, runtime);
                for (key, value) in vars {
                    script.push_str(&format!(" {}={}", key, sh_quote(&value)));
                }
            }
            WindowsToolchain::MinGw => {
                script.push_str(" CC=gcc CXX=g++");
            }
        }
        script.push(' ');
        script.push_str(&sh_quote(&prefix));

        ctx.run(Invocation::new("configure", &bash, &env).arg("-c").arg(script))?;

        self.env = Some(env);
        self.bash = Some(bash);
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> Result<()> {
        let (env, bash) = self.prepared()?;
        ctx.run(
            Invocation::new("make", bash, env)
                .arg("-c")
                .arg(format!("make -j{} install", ctx.jobs)),
        )?;
        Ok(())
    }

    fn package(&mut self, ctx: &BuildContext<'_>) -> Result<()> {
        let pattern = format!("{}/*.exe", unix_path(&ctx.staging_dir.join("bin")));
        let staged = ctx.layout.stage_binaries(&pattern)?;
        if staged.is_empty() {
            return Err(Error::Packaging(format!(
                "no executables found matching {}",
                pattern
            )));
        }
        ctx.append_log(&format!("=== package ===\ncopied {} executable(s)\n", staged.len()));
        Ok(())
    }
}
