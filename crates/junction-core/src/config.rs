//! Controller configuration.
//!
//! Everything has a default, so a missing config file yields a working
//! controller that keeps its state under `./junction-data`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use junction_ir::types::GeoPoint;

use crate::incidents::DEFAULT_JUNCTION_CENTER;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Configuration for one junction controller process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Where the timing settings record is persisted.
    pub settings_path: PathBuf,
    /// Single-slot file used to hand override requests between processes.
    pub mailbox_path: PathBuf,
    /// Delay before the pending-override mailbox is polled at startup (default: 2 s).
    pub relay_delay_ms: u64,
    /// Countdown resolution (default: 1 s).
    pub tick_interval_ms: u64,
    /// Centre of the junction, used to bucket incident locations by direction.
    pub junction_center: GeoPoint,
    /// Capacity of the controller command queue.
    pub command_buffer: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("junction-data/settings.json"),
            mailbox_path: PathBuf::from("junction-data/pending-override.json"),
            relay_delay_ms: 2_000,
            tick_interval_ms: 1_000,
            junction_center: DEFAULT_JUNCTION_CENTER,
            command_buffer: 64,
        }
    }
}

impl ControllerConfig {
    /// Load from `path`, or return defaults when no path is given or the
    /// file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn relay_delay(&self) -> Duration {
        Duration::from_millis(self.relay_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
