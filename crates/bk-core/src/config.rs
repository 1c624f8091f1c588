//! Configuration structures for boardkit.
//!
//! This module provides configuration types for the discovery engine:
//!
//! - [`DiscoveryConfig`] - Search roots, host override, I/O limits
//! - [`SnapshotConfig`] - Where discovery snapshots are persisted
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`], and every section is
//! `#[serde(default)]` so a partial JSON file only overrides what it names.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::HostPlatform;

/// Default bound on concurrently open source files during a library scan.
pub const DEFAULT_MAX_OPEN_FILES: usize = 64;

/// Configuration for a discovery run.
///
/// # Examples
///
/// ```
/// use bk_core::DiscoveryConfig;
///
/// let config = DiscoveryConfig::default();
/// assert!(config.include_defaults);
/// assert!(config.runtime_dirs.is_empty());
/// assert_eq!(config.max_open_files, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Explicit toolchain install locations, searched before the host defaults.
    pub runtime_dirs: Vec<Utf8PathBuf>,

    /// Explicit user sketchbook locations, searched before the home default.
    pub user_dirs: Vec<Utf8PathBuf>,

    /// Whether to append the host-specific default locations.
    pub include_defaults: bool,

    /// Host platform override. `None` means detect from the running host.
    pub host: Option<HostPlatform>,

    /// Home directory override. `None` means ask the OS.
    pub home_dir: Option<Utf8PathBuf>,

    /// Maximum number of source files read concurrently.
    pub max_open_files: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            runtime_dirs: Vec::new(),
            user_dirs: Vec::new(),
            include_defaults: true,
            host: None,
            home_dir: None,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
        }
    }
}

impl DiscoveryConfig {
    /// Returns the configured host platform, or the detected one.
    #[must_use]
    pub fn host_platform(&self) -> HostPlatform {
        self.host.unwrap_or_else(HostPlatform::detect)
    }
}

/// Configuration for snapshot persistence.
///
/// # Examples
///
/// ```
/// use bk_core::SnapshotConfig;
///
/// let config = SnapshotConfig::default();
/// assert!(config.dir.is_none());
/// assert!(config.store_after_scan);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Directory holding `boards.json` and `libraries.json`.
    pub dir: Option<Utf8PathBuf>,

    /// Whether a completed scan is written back to the snapshot directory.
    pub store_after_scan: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: None,
            store_after_scan: true,
        }
    }
}

/// Root configuration for boardkit.
///
/// # Examples
///
/// ```
/// use bk_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"discovery": {"max_open_files": 8}}"#).unwrap();
/// assert_eq!(config.discovery.max_open_files, 8);
/// assert!(config.discovery.include_defaults);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discovery configuration.
    pub discovery: DiscoveryConfig,

    /// Snapshot persistence configuration.
    pub snapshot: SnapshotConfig,
}

impl Config {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] if `path` is a directory,
    /// [`ConfigError::Io`] if it cannot be read, [`ConfigError::Parse`] if
    /// it is not valid JSON, and [`ConfigError::InvalidOption`] if a value
    /// fails validation.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        if path.is_dir() {
            return Err(ConfigError::invalid_path(path, "expected a file, found a directory"));
        }

        let contents = std::fs::read_to_string(path.as_std_path())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks option values that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.max_open_files == 0 {
            return Err(ConfigError::invalid_option(
                "discovery.max_open_files",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
