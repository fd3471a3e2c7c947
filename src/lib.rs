// src/lib.rs

//! Ragel Installer
//!
//! Builds the Ragel state machine compiler from its upstream source release
//! and stages it into a relocatable package.
//!
//! # Architecture
//!
//! - Recipes: TOML descriptions of the source archive, licenses and patches
//! - Targets: os, architecture, compiler and runtime of a build
//! - Kitchen: fetches sources, runs the build strategy for the target, and
//!   packages the result
//! - Package info: the root variable and search path a consumer needs

mod error;
pub mod hash;
pub mod recipe;

pub use error::{Error, Result};
pub use hash::{Checksum, HashAlgorithm, Hasher};
pub use recipe::{
    Cook, CookResult, Kitchen, KitchenConfig, PackageInfo, Recipe, StrategyKind, Target,
    builtin_recipe,
};
