// src/commands/mod.rs
//! Command handlers for the ragel-installer CLI

mod cook;
mod fetch;
mod info;
mod plan;
mod verify;

pub use cook::cmd_cook;
pub use fetch::cmd_fetch;
pub use info::cmd_info;
pub use plan::cmd_plan;
pub use verify::cmd_verify;

use crate::cli::{BuildArgs, CacheArgs, RecipeArgs};
use anyhow::{Context, Result};
use ragel_installer::KitchenConfig;
use ragel_installer::recipe::{Recipe, builtin_recipe, parse_recipe_file, validate_recipe};
use tracing::warn;

/// Load the recipe named on the command line, or the built-in one
pub(crate) fn load_recipe(args: &RecipeArgs) -> Result<Recipe> {
    let recipe = match &args.recipe {
        Some(path) => parse_recipe_file(path)
            .with_context(|| format!("Failed to parse recipe: {}", path.display()))?,
        None => builtin_recipe().context("Built-in recipe is invalid")?,
    };

    let warnings = validate_recipe(&recipe).context("Recipe validation failed")?;
    for warning in &warnings {
        warn!("{}", warning);
    }

    Ok(recipe)
}

/// Kitchen configuration for commands that only fetch
pub(crate) fn cache_config(args: &CacheArgs) -> KitchenConfig {
    let mut config = if args.no_cache {
        KitchenConfig::uncached()
    } else {
        KitchenConfig::default()
    };
    if let Some(dir) = &args.source_cache {
        config.source_cache = Some(dir.clone());
    }
    config.show_progress = !args.no_progress;
    config
}

/// Kitchen configuration for commands that build
pub(crate) fn build_config(args: &BuildArgs) -> KitchenConfig {
    let mut config = cache_config(&args.cache);
    if let Some(jobs) = args.jobs {
        config.jobs = jobs.max(1);
    }
    config.build_root = args.build_root.clone();
    config.msys_root = args.msys_root.clone();
    config.mingw_home = args.mingw_home.clone();
    config.vs_install_dir = args.vs_install_dir.clone();
    config
}
