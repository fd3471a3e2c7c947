// src/commands/info.rs

//! Info command - describe the build a target would get

use super::load_recipe;
use crate::cli::{RecipeArgs, TargetArgs};
use anyhow::Result;
use ragel_installer::recipe::kitchen::{
    EnvProvider, RequirementProvider, declare_build_requirements, select_strategy,
};
use ragel_installer::{Kitchen, KitchenConfig};

pub fn cmd_info(target_args: &TargetArgs, recipe_args: &RecipeArgs) -> Result<()> {
    let recipe = load_recipe(recipe_args)?;
    let mut target = target_args.to_target()?;
    target.normalize()?;
    let strategy = select_strategy(&target)?;

    println!("Package:   {} {}", recipe.package.name, recipe.package.version);
    if let Some(description) = &recipe.package.description {
        println!("           {}", description);
    }
    println!("Target:    {}", target);
    println!("Strategy:  {}", strategy);
    println!(
        "Id:        {}",
        target.package_id(&recipe.package.name, &recipe.package.version)
    );
    println!("Source:    {}", recipe.archive_url());
    println!(
        "Checksum:  {}",
        recipe.source.checksum.as_deref().unwrap_or("(none)")
    );

    let kitchen = Kitchen::new(KitchenConfig::default());
    if kitchen.source_cached(&recipe).unwrap_or(false) {
        println!("Cached:    yes");
    }

    let requirements = declare_build_requirements(&target);
    if requirements.is_empty() {
        println!("Requires:  (nothing)");
    }
    let provider = EnvProvider::new();
    for requirement in &requirements {
        match provider.resolve(requirement) {
            Some(root) => println!("Requires:  {} at {}", requirement, root.display()),
            None => println!(
                "Requires:  {} (not found; set {})",
                requirement, requirement.root_env
            ),
        }
    }

    let patches = recipe.patches_for(target.os);
    for patch in patches {
        println!("Patch:     {}", patch.file);
    }
    Ok(())
}
