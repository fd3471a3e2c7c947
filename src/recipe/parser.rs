// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::hash::Checksum;
use crate::recipe::format::Recipe;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::Parse(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)?;
    parse_recipe(&content)
}

/// Validate a recipe for completeness and correctness
///
/// Returns warnings for things that are allowed but suspicious.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if recipe.package.name.is_empty() {
        return Err(Error::Parse("Recipe package name cannot be empty".to_string()));
    }
    if recipe.package.version.is_empty() {
        return Err(Error::Parse("Recipe package version cannot be empty".to_string()));
    }
    if recipe.package.executable.is_empty() {
        return Err(Error::Parse("Recipe executable cannot be empty".to_string()));
    }

    match &recipe.source.checksum {
        Some(checksum) => {
            Checksum::parse(checksum)?;
        }
        None => warnings.push(format!(
            "No source checksum; {} will be extracted unverified",
            recipe.archive_filename()
        )),
    }

    for patch in &recipe.patches {
        if patch.anchor.is_empty() {
            return Err(Error::Parse(format!(
                "Patch for {} has an empty anchor",
                patch.file
            )));
        }
        if patch.file.starts_with('/') || patch.file.split('/').any(|c| c == "..") {
            return Err(Error::Parse(format!(
                "Patch target must stay inside the source tree: {}",
                patch.file
            )));
        }
    }

    if recipe.package.license.is_none() {
        warnings.push("Missing package license".to_string());
    }
    if recipe.package.license_files.is_empty() {
        warnings.push("No license files will be packaged".to_string());
    }

    Ok(warnings)
}
