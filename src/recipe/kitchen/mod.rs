// src/recipe/kitchen/mod.rs

//! Kitchen: where recipes are cooked
//!
//! The Kitchen drives a recipe through its lifecycle for one target:
//! - Fetching and verifying the source archive
//! - Declaring the tools the build needs
//! - Running the build strategy selected for the target
//! - Staging the executable and licenses into a package layout
//!
//! Subprocesses go through a [`CommandRunner`], so the whole pipeline can be
//! planned without running anything.

mod archive;
mod config;
mod cook;
pub mod environment;
pub mod layout;
pub mod patch;
pub mod requirements;
pub mod runner;
pub mod strategy;

pub use archive::{DownloadOptions, extract_tar_gz, fetch_url};
pub use config::{CookResult, KitchenConfig};
pub use cook::{Cook, CookState, SOURCE_SUBFOLDER};
pub use environment::BuildEnvironment;
pub use layout::{PackageInfo, PackageLayout};
pub use patch::{PatchReport, PatchSet};
pub use requirements::{
    BuildRequirement, EnvProvider, RequirementProvider, ResolvedRequirements,
    declare_build_requirements,
};
pub use runner::{CommandOutput, CommandRunner, Invocation, RecordingRunner, SystemRunner};
pub use strategy::{BuildStrategy, StrategyKind, select_strategy};

use crate::error::{Error, Result};
use crate::hash::Checksum;
use crate::recipe::format::Recipe;
use crate::recipe::target::Target;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A source archive on disk
#[derive(Debug, Clone)]
pub struct FetchedArchive {
    pub path: PathBuf,
    /// Whether `path` lives in the source cache (and must not be removed)
    pub cached: bool,
    /// Set when the archive could not be verified
    pub warning: Option<String>,
}

/// The Kitchen: where recipes are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) provider: Arc<dyn RequirementProvider>,
    /// Environment every build starts from
    pub(crate) base_env: BuildEnvironment,
}

impl Kitchen {
    /// Create a new Kitchen with the given configuration
    pub fn new(config: KitchenConfig) -> Self {
        let provider = Arc::new(config.provider());
        let base_env = BuildEnvironment::inherit(std::env::temp_dir());
        Self {
            config,
            runner: Arc::new(SystemRunner),
            provider,
            base_env,
        }
    }

    /// Create a Kitchen with default configuration
    pub fn with_defaults() -> Self {
        Self::new(KitchenConfig::default())
    }

    /// Run subprocesses through `runner` instead of spawning them
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Resolve build requirements through `provider`
    pub fn with_provider(mut self, provider: Arc<dyn RequirementProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Start builds from `vars` instead of the process environment
    pub fn with_base_environment(mut self, vars: BTreeMap<String, String>) -> Self {
        self.base_env = BuildEnvironment::with_base(vars, std::env::temp_dir());
        self
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Cook a recipe for `target`, placing the package under `output_dir`
    pub fn cook(&self, recipe: &Recipe, target: &Target, output_dir: &Path) -> Result<CookResult> {
        info!(
            "Cooking {} version {} for {}",
            recipe.package.name, recipe.package.version, target
        );

        let mut cook = Cook::new(self, recipe, target.clone(), output_dir)?;

        cook.configure()?;

        info!("Fetching source...");
        cook.fetch_source()?;

        cook.declare_build_requirements()?;

        info!("Building...");
        cook.select_and_run_build()?;

        info!("Packaging...");
        cook.package()?;

        let info = cook.publish_package_info()?;
        let result = cook.finish(info);
        info!("Package ready at {}", result.package_dir.display());
        Ok(result)
    }

    /// Fetch and verify the source archive without building
    ///
    /// With a source cache configured the archive stays in the cache and its
    /// path is returned. Without one it is downloaded into `dest_dir`.
    pub fn fetch(&self, recipe: &Recipe, dest_dir: &Path) -> Result<FetchedArchive> {
        info!(
            "Fetching sources for {} version {}",
            recipe.package.name, recipe.package.version
        );
        fs::create_dir_all(dest_dir)?;
        self.fetch_source(recipe, dest_dir)
    }

    /// Whether the source archive is already in the cache
    pub fn source_cached(&self, recipe: &Recipe) -> Result<bool> {
        let (Some(cache), Some(checksum)) = (&self.config.source_cache, recipe_checksum(recipe)?)
        else {
            return Ok(false);
        };
        Ok(cache.join(checksum.cache_key()).is_file())
    }

    fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            timeout: self.config.timeout,
            show_progress: self.config.show_progress,
        }
    }

    /// Fetch a source archive (with caching)
    pub(crate) fn fetch_source(&self, recipe: &Recipe, dest_dir: &Path) -> Result<FetchedArchive> {
        let url = recipe.archive_url();
        let checksum = recipe_checksum(recipe)?;

        let Some(checksum) = checksum else {
            let warning = format!("No checksum for {}; source is unverified", url);
            warn!("{}", warning);
            let dest = dest_dir.join(recipe.archive_filename());
            info!("Downloading: {}", url);
            fetch_url(&url, &dest, &self.download_options())?;
            return Ok(FetchedArchive {
                path: dest,
                cached: false,
                warning: Some(warning),
            });
        };

        let Some(cache) = &self.config.source_cache else {
            let dest = dest_dir.join(recipe.archive_filename());
            info!("Downloading: {}", url);
            fetch_url(&url, &dest, &self.download_options())?;
            verify_or_remove(&dest, &checksum)?;
            return Ok(FetchedArchive {
                path: dest,
                cached: false,
                warning: None,
            });
        };

        fs::create_dir_all(cache)?;
        let cached_path = cache.join(checksum.cache_key());

        if cached_path.exists() {
            debug!("Using cached source: {}", cached_path.display());
            match checksum.verify_file(&cached_path) {
                Ok(()) => {
                    return Ok(FetchedArchive {
                        path: cached_path,
                        cached: true,
                        warning: None,
                    });
                }
                Err(Error::Integrity { .. }) => {
                    warn!("Cached file checksum mismatch, re-downloading");
                    fs::remove_file(&cached_path)?;
                }
                Err(e) => return Err(e),
            }
        }

        info!("Downloading: {}", url);
        let temp_path = cache.join(format!("{}.tmp", checksum.cache_key()));
        fetch_url(&url, &temp_path, &self.download_options())?;
        verify_or_remove(&temp_path, &checksum)?;

        fs::rename(&temp_path, &cached_path)?;
        Ok(FetchedArchive {
            path: cached_path,
            cached: true,
            warning: None,
        })
    }

    /// Run the packaged executable with `--version`
    ///
    /// The published search path is prepended and the root variable set, as
    /// a consumer of the package would see them.
    pub fn verify_package(&self, info: &PackageInfo, executable: &str) -> Result<String> {
        let mut env = self.base_env.in_dir(&info.root);
        for entry in info.path.iter().rev() {
            env.prepend_path(entry);
        }
        env.set(info.root_env.clone(), info.root.to_string_lossy());

        let program = info.root.join("bin").join(executable);
        if !program.is_file() {
            return Err(Error::Packaging(format!(
                "{} is not in the package",
                program.display()
            )));
        }

        let output = self
            .runner
            .run(&Invocation::new("verify", program, &env).arg("--version"))?;
        let version = output.stdout.lines().next().unwrap_or_default().trim().to_string();
        info!("Package reports: {}", version);
        Ok(version)
    }
}

fn recipe_checksum(recipe: &Recipe) -> Result<Option<Checksum>> {
    recipe
        .source
        .checksum
        .as_deref()
        .map(Checksum::parse)
        .transpose()
}

fn verify_or_remove(path: &Path, checksum: &Checksum) -> Result<()> {
    if let Err(e) = checksum.verify_file(path) {
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parser::parse_recipe;

    fn recipe_for(archive: &Path, checksum: Option<&str>) -> Recipe {
        let checksum = checksum
            .map(|c| format!("checksum = \"{}\"\n", c))
            .unwrap_or_default();
        parse_recipe(&format!(
            r#"
[package]
name = "demo"
version = "1.0"
executable = "demo"

[source]
archive = "file://{}"
{}"#,
            archive.display(),
            checksum
        ))
        .unwrap()
    }

    fn kitchen(cache: Option<PathBuf>) -> Kitchen {
        Kitchen::new(KitchenConfig {
            source_cache: cache,
            ..KitchenConfig::uncached()
        })
        .with_base_environment(BTreeMap::new())
    }

    #[test]
    fn test_fetch_into_cache_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo-1.0.tar.gz");
        fs::write(&archive, b"demo archive").unwrap();
        let checksum = crate::hash::hash_bytes(crate::hash::HashAlgorithm::Sha256, b"demo archive");
        let recipe = recipe_for(&archive, Some(&checksum.to_string()));
        let kitchen = kitchen(Some(tmp.path().join("cache")));

        assert!(!kitchen.source_cached(&recipe).unwrap());
        let first = kitchen.fetch(&recipe, tmp.path()).unwrap();
        assert!(first.cached);
        assert!(kitchen.source_cached(&recipe).unwrap());

        fs::remove_file(&archive).unwrap();
        let second = kitchen.fetch(&recipe, tmp.path()).unwrap();
        assert_eq!(first.path, second.path);
    }

    #[test]
    fn test_fetch_mismatch_is_integrity_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo-1.0.tar.gz");
        fs::write(&archive, b"tampered").unwrap();
        let checksum = crate::hash::hash_bytes(crate::hash::HashAlgorithm::Sha256, b"original");
        let recipe = recipe_for(&archive, Some(&checksum.to_string()));
        let out = tmp.path().join("out");
        fs::create_dir(&out).unwrap();

        let err = kitchen(None).fetch(&recipe, &out).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
        assert!(!out.join("demo-1.0.tar.gz").exists());
    }

    #[test]
    fn test_fetch_without_checksum_warns() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("demo-1.0.tar.gz");
        fs::write(&archive, b"demo").unwrap();
        let out = tmp.path().join("out");

        let fetched = kitchen(None).fetch(&recipe_for(&archive, None), &out).unwrap();
        assert!(!fetched.cached);
        assert!(fetched.warning.is_some());
        assert!(fetched.path.starts_with(&out));
    }
}
