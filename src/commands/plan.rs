// src/commands/plan.rs

//! Plan command - show the build commands without running them
//!
//! The source archive is really fetched and extracted (patches need real
//! files); every subprocess goes to a recording runner instead.

use super::{build_config, load_recipe};
use crate::cli::{BuildArgs, RecipeArgs, TargetArgs};
use anyhow::{Context, Result};
use ragel_installer::recipe::kitchen::RecordingRunner;
use ragel_installer::{Cook, Error, Kitchen};
use std::sync::Arc;

/// Stand-ins for tool output the plan cannot observe
const PLACEHOLDER_VS_INSTALL: &str = "<VSINSTALLDIR>";
const PLACEHOLDER_VCVARS: &str = "PATH=<vcvars PATH>\nINCLUDE=<vcvars INCLUDE>\nLIB=<vcvars LIB>\n";

pub fn cmd_plan(
    target_args: &TargetArgs,
    recipe_args: &RecipeArgs,
    build_args: &BuildArgs,
) -> Result<()> {
    let recipe = load_recipe(recipe_args)?;
    let target = target_args.to_target()?;

    let runner = Arc::new(RecordingRunner::new());
    runner.respond("vswhere", PLACEHOLDER_VS_INSTALL);
    runner.respond("vcvars", PLACEHOLDER_VCVARS);

    let kitchen = Kitchen::new(build_config(build_args)).with_runner(runner.clone());
    let output = tempfile::tempdir().context("Failed to create scratch output directory")?;

    let mut cook = Cook::new(&kitchen, &recipe, target, output.path())?;
    cook.configure()?;
    println!("Target:   {}", cook.target());
    if let Some(kind) = cook.strategy_kind() {
        println!("Strategy: {}", kind);
    }
    println!("Package:  {}", cook.package_id());

    cook.fetch_source().context("Failed to fetch sources")?;
    cook.declare_build_requirements()?;

    let built = cook.select_and_run_build();
    let packaged = built.and_then(|()| cook.package());

    println!();
    for (index, call) in runner.calls().iter().enumerate() {
        println!("{:>2}. {}", index + 1, call);
        for (key, value) in call.env.overrides() {
            println!("      {}={}", key, value);
        }
        if call.env.is_removed("VisualStudioVersion") {
            println!("      unset VisualStudioVersion");
        }
    }

    match packaged {
        Ok(()) => Ok(()),
        // Nothing was really built, so there is nothing to package
        Err(Error::Packaging(_)) => Ok(()),
        Err(e) => Err(e).context("Plan stopped early"),
    }
}
