//! Reader configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```rust
//! use rf2_shmem::{AccessMode, Config};
//!
//! let config = Config::from_yaml_str("access_mode: direct\nsync:\n  slow_poll_ms: 250\n")?;
//! assert_eq!(config.access_mode, AccessMode::Direct);
//! assert_eq!(config.sync.slow_poll_ms, 250);
//! assert_eq!(config.sync.fast_poll_ms, 10);
//! # Ok::<(), rf2_shmem::TelemetryError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{AccessMode, INVALID_INDEX, MAX_MAPPED_VEHICLES};
use crate::{Result, TelemetryError};

/// Top-level configuration for [`Rf2Memory`](crate::Rf2Memory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Access mode for the scoring and telemetry buffers
    pub access_mode: AccessMode,

    /// Simulator process id appended to region names; empty selects the local instance
    pub instance_id: String,

    /// Use `player_index` instead of the simulator's player flag
    pub player_override: bool,

    /// Manual scoring slot of the local player, `-1` for none
    pub player_index: i32,

    pub sync: SyncConfig,

    pub region: RegionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::Copy,
            instance_id: String::new(),
            player_override: false,
            player_index: INVALID_INDEX,
            sync: SyncConfig::default(),
            region: RegionConfig::default(),
        }
    }
}

impl Config {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(yaml)?;
        Ok(config.normalized())
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::config_error(format!("reading {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Clamp out-of-range values.
    pub fn normalized(mut self) -> Self {
        self.player_index = clamp_player_index(self.player_index);
        self
    }
}

/// Clamp a scoring slot to `[-1, MAX_MAPPED_VEHICLES - 1]`.
pub fn clamp_player_index(index: i32) -> i32 {
    index.clamp(INVALID_INDEX, MAX_MAPPED_VEHICLES as i32 - 1)
}

/// Timing policy of the background sync loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Poll interval while the simulator is updating
    pub fast_poll_ms: u64,

    /// Poll interval while the scoring version is frozen
    pub slow_poll_ms: u64,

    /// How long the scoring version may stay unchanged before the data counts as frozen
    pub freeze_after_ms: u64,

    /// Consecutive failed player lookups before the data is reported as paused
    pub pause_after_failures: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { fast_poll_ms: 10, slow_poll_ms: 500, freeze_after_ms: 2000, pause_after_failures: 5 }
    }
}

impl SyncConfig {
    pub fn fast_poll(&self) -> Duration {
        Duration::from_millis(self.fast_poll_ms)
    }

    pub fn slow_poll(&self) -> Duration {
        Duration::from_millis(self.slow_poll_ms)
    }

    pub fn freeze_after(&self) -> Duration {
        Duration::from_millis(self.freeze_after_ms)
    }
}

/// Where regions live on platforms without named kernel mappings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Directory holding the file-backed regions (ignored on Windows)
    pub shm_dir: PathBuf,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self { shm_dir: PathBuf::from("/dev/shm") }
    }
}
