// src/commands/verify.rs

//! Verify command - run a packaged executable

use super::cook::PACKAGE_INFO_FILE;
use super::load_recipe;
use crate::cli::RecipeArgs;
use anyhow::{Context, Result};
use ragel_installer::recipe::kitchen::{PackageInfo, PackageLayout};
use ragel_installer::{Kitchen, KitchenConfig};
use std::fs;
use std::path::Path;

pub fn cmd_verify(package_dir: &Path, recipe_args: &RecipeArgs) -> Result<()> {
    let recipe = load_recipe(recipe_args)?;
    let layout = PackageLayout::new(package_dir);

    let info_path = package_dir
        .parent()
        .map(|p| p.join(PACKAGE_INFO_FILE))
        .filter(|p| p.is_file());
    let info = match info_path {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<PackageInfo>(&json)
                .with_context(|| format!("Invalid package info in {}", path.display()))?
        }
        None => layout.info(&recipe.root_env()),
    };

    // Windows packages carry the .exe suffix
    let windows_exe = format!("{}.exe", recipe.package.executable);
    let executable = if layout.bin_dir().join(&windows_exe).is_file() {
        windows_exe
    } else {
        recipe.package.executable.clone()
    };

    layout
        .verify(&executable, &recipe.package.license_files)
        .with_context(|| format!("{} is not a complete package", package_dir.display()))?;

    let version = Kitchen::new(KitchenConfig::uncached())
        .verify_package(&info, &executable)
        .context("Packaged executable failed to run")?;
    println!("[OK] {}", version);
    Ok(())
}
