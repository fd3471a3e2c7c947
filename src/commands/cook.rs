// src/commands/cook.rs

//! Cook command - build and package Ragel for a target

use super::{build_config, load_recipe};
use crate::cli::{BuildArgs, RecipeArgs, TargetArgs};
use anyhow::{Context, Result};
use ragel_installer::{Kitchen, Target};
use std::fs;
use std::path::Path;
use tracing::info;

/// File written next to the package directory
pub const PACKAGE_INFO_FILE: &str = "package_info.json";

/// Cook a package for a target
pub fn cmd_cook(
    target_args: &TargetArgs,
    recipe_args: &RecipeArgs,
    build_args: &BuildArgs,
    output_dir: &Path,
    keep_builddir: bool,
    verify: bool,
) -> Result<()> {
    let recipe = load_recipe(recipe_args)?;
    let target = target_args.to_target()?;

    let mut config = build_config(build_args);
    config.keep_builddir = keep_builddir;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let kitchen = Kitchen::new(config);
    eprintln!(
        "Cooking {} {} for {} with {} parallel jobs...",
        recipe.package.name,
        recipe.package.version,
        target,
        kitchen.config().jobs
    );
    if kitchen.source_cached(&recipe).unwrap_or(false) {
        eprintln!("  - Sources already cached");
    }

    let result = kitchen
        .cook(&recipe, &target, output_dir)
        .with_context(|| format!("Failed to cook {}", recipe.package.name))?;

    let info_path = result
        .package_dir
        .parent()
        .unwrap_or(output_dir)
        .join(PACKAGE_INFO_FILE);
    let json = result.info.to_json()?;
    fs::write(&info_path, json)
        .with_context(|| format!("Failed to write {}", info_path.display()))?;

    let native = Target::host().map(|h| h.os == target.os).unwrap_or(false);
    if verify && !native {
        eprintln!("Skipping verification: {} binaries do not run on this host", target.os);
    } else if verify {
        let executable = recipe.executable_name(target.os);
        let version = kitchen
            .verify_package(&result.info, &executable)
            .context("Packaged executable failed to run")?;
        eprintln!("[OK] {}", version);
    }

    if !result.warnings.is_empty() {
        eprintln!("\nBuild warnings:");
        for warning in &result.warnings {
            eprintln!("  - {}", warning);
        }
    }
    if let Some(dir) = &result.build_dir {
        eprintln!("Build directory kept at {}", dir.display());
    }

    eprintln!(
        "\n[COMPLETE] Cooked {} ({} strategy, id {})",
        result.package_dir.display(),
        result.strategy,
        result.package_id
    );
    print!("{}", result.info.shell_exports());

    info!(
        "Successfully cooked {} to {}",
        recipe.package.name,
        result.package_dir.display()
    );
    Ok(())
}
