// src/commands/fetch.rs

//! Fetch command - download and verify sources only

use super::{cache_config, load_recipe};
use crate::cli::{CacheArgs, RecipeArgs};
use anyhow::{Context, Result};
use ragel_installer::Kitchen;
use std::path::Path;

pub fn cmd_fetch(recipe_args: &RecipeArgs, cache_args: &CacheArgs, dest: &Path) -> Result<()> {
    let recipe = load_recipe(recipe_args)?;
    let kitchen = Kitchen::new(cache_config(cache_args));

    eprintln!("Fetching {}", recipe.archive_url());
    let fetched = kitchen
        .fetch(&recipe, dest)
        .with_context(|| format!("Failed to fetch sources for {}", recipe.package.name))?;

    if let Some(warning) = &fetched.warning {
        eprintln!("Warning: {}", warning);
    }
    if fetched.cached {
        eprintln!("[OK] Source is cached. Ready for offline build.");
    }
    println!("{}", fetched.path.display());
    Ok(())
}
