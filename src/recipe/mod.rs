// src/recipe/mod.rs

//! Recipe system for building packages from source
//!
//! A recipe names one upstream source release and how to package it:
//! - The source archive and its checksum
//! - License files and the executable to stage
//! - Source edits needed on particular platforms
//!
//! # Culinary Terminology
//!
//! - **Recipe**: The build specification (like a recipe card)
//! - **Kitchen**: Fetches, builds and packages recipes
//! - **Cook**: One recipe build for one target, stage by stage
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "ragel_installer"
//! version = "6.10"
//! executable = "ragel"
//! license_files = ["COPYING", "CREDITS"]
//!
//! [source]
//! archive = "http://www.colm.net/files/ragel/ragel-%(version)s.tar.gz"
//! checksum = "sha256:5f156edb65d20b856d638dd9ee2dfb43285914d9aa2b6ec779dac0270cd56c3f"
//!
//! [[patch]]
//! file = "ragel/main.cpp"
//! anchor = "#include <unistd.h>"
//! platforms = ["windows"]
//! ```

mod format;
pub mod kitchen;
pub mod parser;
pub mod target;

pub use format::{PackageSection, PatchSpec, Recipe, SourceSection};
pub use kitchen::{Cook, CookResult, CookState, Kitchen, KitchenConfig, PackageInfo, StrategyKind};
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
pub use target::{Arch, Compiler, CompilerFamily, Os, Runtime, Target};

use crate::error::Result;

const BUILTIN_RECIPE: &str = include_str!("../../recipes/ragel.toml");

/// The embedded Ragel 6.10 recipe
pub fn builtin_recipe() -> Result<Recipe> {
    parse_recipe(BUILTIN_RECIPE)
}
