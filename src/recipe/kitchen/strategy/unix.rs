// src/recipe/kitchen/strategy/unix.rs

//! Plain autotools build for Linux and macOS

use super::{BuildContext, BuildStrategy, StrategyKind};
use crate::error::{Error, Result};
use crate::recipe::kitchen::environment::BuildEnvironment;
use crate::recipe::kitchen::runner::Invocation;
use crate::recipe::target::{Arch, CompilerFamily};

#[derive(Debug, Default)]
pub struct UnixStrategy {
    env: Option<BuildEnvironment>,
}

impl UnixStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn env(&self) -> Result<&BuildEnvironment> {
        self.env.as_ref().ok_or_else(|| Error::InvalidState {
            expected: "configured unix build".to_string(),
            found: "unconfigured".to_string(),
        })
    }
}

/// C and C++ compiler driver names for a family
fn compiler_drivers(family: CompilerFamily) -> Option<(&'static str, &'static str)> {
    match family {
        CompilerFamily::Gcc => Some(("gcc", "g++")),
        CompilerFamily::Clang | CompilerFamily::AppleClang => Some(("clang", "clang++")),
        CompilerFamily::VisualStudio => None,
    }
}

impl BuildStrategy for UnixStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Unix
    }

    fn configure(&mut self, ctx: &BuildContext<'_>) -> Result<()> {
        let mut env = ctx.base_env.in_dir(ctx.source_dir);
        if let Some((cc, cxx)) = compiler_drivers(ctx.target.compiler.family) {
            env.set("CC", cc);
            env.set("CXX", cxx);
        }
        if ctx.target.arch == Arch::X86 {
            for var in ["CFLAGS", "CXXFLAGS", "LDFLAGS"] {
                env.set(var, "-m32");
            }
        }

        ctx.run(
            Invocation::new("configure", ctx.source_dir.join("configure"), &env)
                .arg(format!("--prefix={}", ctx.layout.root().display())),
        )?;

        self.env = Some(env);
        Ok(())
    }

    fn build(&mut self, ctx: &BuildContext<'_>) -> Result<()> {
        let env = self.env()?;
        ctx.run(Invocation::new("make", "make", env).arg(format!("-j{}", ctx.jobs)))?;
        Ok(())
    }

    fn package(&mut self, ctx: &BuildContext<'_>) -> Result<()> {
        let env = self.env()?;
        ctx.run(Invocation::new("install", "make", env).arg("install"))?;
        Ok(())
    }
}
