//! System-wide configuration for sidesnap
//!
//! System config is stored at `~/.config/sidesnap/config.toml` (Linux/macOS)
//! or `%APPDATA%\sidesnap\config.toml` (Windows). Every field is optional;
//! command-line flags override whatever the file sets.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sidesnap_core::workspace::{DEFAULT_GIT_DIR, DEFAULT_SCRATCH_DIR};
use sidesnap_core::AcquireOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// System-wide sidesnap configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Scratch directory, relative to the work tree (default: scratch)
    pub scratch_dir: String,

    /// Sidecar store directory (default: .git-scratch)
    pub git_dir: String,

    pub lock: LockConfig,

    pub watch: WatchConfig,

    pub prune: PruneConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            scratch_dir: DEFAULT_SCRATCH_DIR.to_string(),
            git_dir: DEFAULT_GIT_DIR.to_string(),
            lock: LockConfig::default(),
            watch: WatchConfig::default(),
            prune: PruneConfig::default(),
        }
    }
}

/// Store lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Give up acquiring after this many milliseconds (default: 5000)
    pub timeout_ms: u64,

    /// Pause between attempts in milliseconds (default: 100)
    pub retry_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            retry_ms: 100,
        }
    }
}

impl LockConfig {
    pub fn acquire_options(&self) -> AcquireOptions {
        AcquireOptions::from_millis(self.timeout_ms, self.retry_ms)
    }
}

/// Watch session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Glob pattern; defaults to `<scratch_dir>/**/*.md`
    pub pattern: Option<String>,

    /// Debounce window in milliseconds (default: 500)
    pub debounce_ms: u64,

    /// Record deletions as snapshots (default: false)
    pub include_delete: bool,

    /// Snapshot files already present at startup (default: true)
    pub initial_snap: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            pattern: None,
            debounce_ms: 500,
            include_delete: false,
            initial_snap: true,
        }
    }
}

/// Prune configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Commits kept by `sidesnap prune` without `--keep` (default: 100)
    pub keep: usize,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self { keep: 100 }
    }
}

/// Get the system config directory path
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| h.join(".config/sidesnap"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir().map(|c| c.join("sidesnap"))
    }
}

/// Get the system config file path
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load system configuration
///
/// Returns default config if the file doesn't exist.
pub fn load() -> Result<SystemConfig> {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::debug!("Could not determine config directory, using defaults");
            Ok(SystemConfig::default())
        }
    }
}

pub fn load_from(config_path: &Path) -> Result<SystemConfig> {
    if !config_path.exists() {
        tracing::debug!("System config not found at {}, using defaults", config_path.display());
        return Ok(SystemConfig::default());
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read system config at {}", config_path.display()))?;

    let config: SystemConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse system config at {}", config_path.display()))?;

    tracing::debug!("Loaded system config from {}", config_path.display());
    Ok(config)
}
