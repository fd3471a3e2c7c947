// src/recipe/kitchen/cook.rs

//! Cook: the lifecycle of a single recipe build
//!
//! The stages run strictly in order:
//!
//! ```text
//! Unconfigured -> Configured -> Sourced -> Built -> Packaged -> Published
//! ```
//!
//! Calling a stage out of order fails with [`Error::InvalidState`].

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::recipe::target::Target;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use strum_macros::Display;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::Kitchen;
use super::archive::{extract_tar_gz, find_extracted_root};
use super::config::CookResult;
use super::layout::{PackageInfo, PackageLayout};
use super::requirements::{BuildRequirement, ResolvedRequirements, declare_build_requirements};
use super::strategy::{BuildContext, BuildStrategy, StrategyKind, strategy_for};

/// Name of the extracted source tree inside the build directory
pub const SOURCE_SUBFOLDER: &str = "source_subfolder";

/// Where a cook is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CookState {
    Unconfigured,
    Configured,
    Sourced,
    Built,
    Packaged,
    Published,
}

/// A single cook operation
pub struct Cook<'a> {
    kitchen: &'a Kitchen,
    recipe: &'a Recipe,
    target: Target,
    state: CookState,
    /// Temporary build directory
    build_dir: TempDir,
    /// Source directory within build_dir, once extracted
    source_dir: PathBuf,
    /// Install prefix for strategies that stage before packaging
    staging_dir: PathBuf,
    layout: PackageLayout,
    package_id: String,
    strategy: Option<Box<dyn BuildStrategy>>,
    requirements: Vec<BuildRequirement>,
    resolved: ResolvedRequirements,
    /// Build log accumulator
    log: RefCell<String>,
    warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    /// Prepare a cook whose package will be placed under `output_dir`
    pub fn new(
        kitchen: &'a Kitchen,
        recipe: &'a Recipe,
        target: Target,
        output_dir: &Path,
    ) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ragel-build-");
        let build_dir = match &kitchen.config.build_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let source_dir = build_dir.path().join(SOURCE_SUBFOLDER);
        let staging_dir = build_dir.path().join("install");

        Ok(Self {
            kitchen,
            recipe,
            target,
            state: CookState::Unconfigured,
            build_dir,
            source_dir,
            staging_dir,
            layout: PackageLayout::new(output_dir),
            package_id: String::new(),
            strategy: None,
            requirements: Vec::new(),
            resolved: ResolvedRequirements::default(),
            log: RefCell::new(String::new()),
            warnings: Vec::new(),
        })
    }

    pub fn state(&self) -> CookState {
        self.state
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn build_dir(&self) -> &Path {
        self.build_dir.path()
    }

    pub fn strategy_kind(&self) -> Option<StrategyKind> {
        self.strategy.as_ref().map(|s| s.kind())
    }

    pub fn requirements(&self) -> &[BuildRequirement] {
        &self.requirements
    }

    fn ensure_state(&self, expected: CookState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                expected: expected.to_string(),
                found: self.state.to_string(),
            });
        }
        Ok(())
    }

    fn log_line(&self, line: &str) {
        let mut log = self.log.borrow_mut();
        log.push_str(line);
        log.push('\n');
    }

    /// Stage 1: normalize the target and pick the build strategy
    pub fn configure(&mut self) -> Result<()> {
        self.ensure_state(CookState::Unconfigured)?;

        self.target.normalize()?;
        let strategy = strategy_for(&self.target)?;
        self.package_id = self
            .target
            .package_id(&self.recipe.package.name, &self.recipe.package.version);

        // Package root: <output>/<name>-<version>-<id>/package
        let output_dir = self.layout.root().to_path_buf();
        self.layout = PackageLayout::new(
            output_dir
                .join(format!(
                    "{}-{}-{}",
                    self.recipe.package.name, self.recipe.package.version, self.package_id
                ))
                .join("package"),
        );

        info!(
            "Configured {} for {} ({} strategy, id {})",
            self.recipe.package.name,
            self.target,
            strategy.kind(),
            self.package_id
        );
        self.log_line(&format!("Target: {}", self.target));
        self.log_line(&format!("Package id: {}", self.package_id));
        self.strategy = Some(strategy);
        self.state = CookState::Configured;
        Ok(())
    }

    /// Stage 2: fetch, verify and extract the source archive
    pub fn fetch_source(&mut self) -> Result<()> {
        self.ensure_state(CookState::Configured)?;

        let fetched = self.kitchen.fetch_source(self.recipe, self.build_dir.path())?;
        if let Some(warning) = &fetched.warning {
            self.warnings.push(warning.clone());
        }
        self.log_line(&format!("Fetched source: {}", self.recipe.archive_url()));

        if self.source_dir.exists() {
            debug!("Removing previous {}", self.source_dir.display());
            fs::remove_dir_all(&self.source_dir)?;
        }

        let unpack_dir = self.build_dir.path().join("unpack");
        if unpack_dir.exists() {
            fs::remove_dir_all(&unpack_dir)?;
        }
        fs::create_dir_all(&unpack_dir)?;
        extract_tar_gz(&fetched.path, &unpack_dir)?;

        let root = find_extracted_root(&unpack_dir, &self.recipe.extract_dir())?;
        fs::rename(&root, &self.source_dir)?;
        fs::remove_dir_all(&unpack_dir)?;

        if !fetched.cached {
            fs::remove_file(&fetched.path)?;
        }

        self.log_line(&format!("Extracted source to {}", self.source_dir.display()));
        self.state = CookState::Sourced;
        Ok(())
    }

    /// Declare and resolve the tools the build needs
    ///
    /// Unresolved requirements are recorded here; the strategy decides
    /// whether it can do without them.
    pub fn declare_build_requirements(&mut self) -> Result<()> {
        self.ensure_state(CookState::Sourced)?;

        self.requirements = declare_build_requirements(&self.target);
        self.resolved =
            ResolvedRequirements::resolve(&self.requirements, self.kitchen.provider.as_ref());
        for requirement in &self.requirements {
            self.log_line(&format!("Build requirement: {}", requirement));
        }
        Ok(())
    }

    fn context(&self) -> BuildContext<'_> {
        BuildContext {
            recipe: self.recipe,
            target: &self.target,
            source_dir: &self.source_dir,
            staging_dir: &self.staging_dir,
            layout: &self.layout,
            requirements: &self.resolved,
            base_env: &self.kitchen.base_env,
            runner: self.kitchen.runner.as_ref(),
            jobs: self.kitchen.config.jobs,
            vs_install_dir: self.kitchen.config.vs_install_dir.as_deref(),
            log: &self.log,
        }
    }

    fn take_strategy(&mut self) -> Result<Box<dyn BuildStrategy>> {
        self.strategy.take().ok_or_else(|| Error::InvalidState {
            expected: "selected strategy".to_string(),
            found: self.state.to_string(),
        })
    }

    /// Stage 3: run the selected strategy's configure and build steps
    pub fn select_and_run_build(&mut self) -> Result<()> {
        self.ensure_state(CookState::Sourced)?;

        let mut strategy = self.take_strategy()?;
        let result = {
            let ctx = self.context();
            strategy
                .configure(&ctx)
                .and_then(|()| strategy.build(&ctx))
        };
        self.strategy = Some(strategy);
        result?;

        self.state = CookState::Built;
        Ok(())
    }

    /// Stage 4: assemble the package layout
    pub fn package(&mut self) -> Result<()> {
        self.ensure_state(CookState::Built)?;

        if self.layout.root().exists() {
            warn!("Replacing existing package at {}", self.layout.root().display());
            fs::remove_dir_all(self.layout.root())?;
        }
        self.layout.create()?;
        self.layout
            .stage_licenses(&self.source_dir, &self.recipe.package.license_files)?;

        let mut strategy = self.take_strategy()?;
        let result = {
            let ctx = self.context();
            strategy.package(&ctx)
        };
        self.strategy = Some(strategy);
        result?;

        let executable = self.recipe.executable_name(self.target.os);
        self.layout
            .verify(&executable, &self.recipe.package.license_files)?;

        let files = self.layout.files();
        self.log_line(&format!(
            "Packaged {} file(s) into {}",
            files.len(),
            self.layout.root().display()
        ));
        self.state = CookState::Packaged;
        Ok(())
    }

    /// Stage 5: publish the package metadata
    pub fn publish_package_info(&mut self) -> Result<PackageInfo> {
        self.ensure_state(CookState::Packaged)?;
        let info = self.layout.info(&self.recipe.root_env());
        self.state = CookState::Published;
        Ok(info)
    }

    /// Consume the cook into its result
    pub fn finish(self, info: PackageInfo) -> CookResult {
        let strategy = self.strategy_kind().unwrap_or(StrategyKind::Unix);
        let build_dir = if self.kitchen.config.keep_builddir {
            let path = self.build_dir.keep();
            info!("Keeping build directory {}", path.display());
            Some(path)
        } else {
            None
        };

        CookResult {
            package_dir: self.layout.root().to_path_buf(),
            package_id: self.package_id,
            strategy,
            info,
            log: self.log.into_inner(),
            warnings: self.warnings,
            build_dir,
        }
    }
}
