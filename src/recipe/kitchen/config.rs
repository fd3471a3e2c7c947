// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen build system

use super::layout::PackageInfo;
use super::requirements::{EnvProvider, MINGW, MSYS2};
use super::strategy::StrategyKind;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Directory for verified source archives, keyed by checksum
    /// (`None` downloads into the build directory every time)
    pub source_cache: Option<PathBuf>,
    /// Parent directory for temporary build directories
    pub build_root: Option<PathBuf>,
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// Number of parallel jobs passed to make
    pub jobs: u32,
    /// Keep build directory after completion (for debugging)
    pub keep_builddir: bool,
    /// Show a progress bar while downloading
    pub show_progress: bool,
    /// MSYS2 install root, overriding `MSYS_ROOT`
    pub msys_root: Option<PathBuf>,
    /// MinGW install root, overriding `MINGW_HOME`
    pub mingw_home: Option<PathBuf>,
    /// Visual Studio installation directory, skipping vswhere
    pub vs_install_dir: Option<PathBuf>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        Self {
            source_cache: dirs::cache_dir().map(|d| d.join("ragel-installer").join("sources")),
            build_root: None,
            timeout: Duration::from_secs(300),
            jobs,
            keep_builddir: false,
            show_progress: false,
            msys_root: None,
            mingw_home: None,
            vs_install_dir: None,
        }
    }
}

impl KitchenConfig {
    /// Configuration that never touches the user's cache directory
    pub fn uncached() -> Self {
        Self {
            source_cache: None,
            ..Self::default()
        }
    }

    /// Requirement provider honoring the explicit roots in this config
    pub fn provider(&self) -> EnvProvider {
        let mut provider = EnvProvider::new();
        if let Some(root) = &self.msys_root {
            provider = provider.with_root(MSYS2, root);
        }
        if let Some(root) = &self.mingw_home {
            provider = provider.with_root(MINGW, root);
        }
        provider
    }
}

/// Result of cooking a recipe
#[derive(Debug)]
pub struct CookResult {
    /// Root of the package layout
    pub package_dir: PathBuf,
    /// Content id of the normalized target settings
    pub package_id: String,
    /// Strategy that built the package
    pub strategy: StrategyKind,
    /// Published metadata
    pub info: PackageInfo,
    /// Build log
    pub log: String,
    /// Warnings generated during build
    pub warnings: Vec<String>,
    /// Build directory, when kept
    pub build_dir: Option<PathBuf>,
}
