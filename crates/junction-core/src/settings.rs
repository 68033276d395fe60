//! Persistence of the operator timing settings.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use junction_ir::parse::{parse_timing_config, ParseError};
use junction_ir::types::TimingConfig;

use crate::persist::write_atomically;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings record is malformed: {0}")]
    Parse(#[from] ParseError),

    #[error("Settings encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Settings store unavailable")]
    Unavailable,
}

/// External store for [`TimingConfig`].
pub trait SettingsStore: Send {
    /// Load the stored settings, `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<TimingConfig>, SettingsError>;

    fn save(&self, config: &TimingConfig) -> Result<(), SettingsError>;
}

/// Settings kept as a JSON record on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<TimingConfig>, SettingsError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (config, adjustments) = parse_timing_config(&text)?;
        for adj in &adjustments {
            tracing::warn!(
                field = adj.field,
                requested = adj.requested,
                applied = adj.applied,
                "stored setting out of range, clamped"
            );
        }
        Ok(Some(config))
    }

    fn save(&self, config: &TimingConfig) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomically(&self.path, json.as_bytes())?;
        Ok(())
    }
}

/// In-memory settings slot. Clones share the slot, so a test can keep a
/// handle after giving the store to a session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<TimingConfig>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TimingConfig) -> Self {
        let store = Self::new();
        *store.slot.lock().unwrap() = Some(config);
        store
    }

    /// Simulate an outage: every call fails until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<TimingConfig> {
        *self.slot.lock().unwrap()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<TimingConfig>, SettingsError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SettingsError::Unavailable);
        }
        Ok(*self.slot.lock().unwrap())
    }

    fn save(&self, config: &TimingConfig) -> Result<(), SettingsError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SettingsError::Unavailable);
        }
        *self.slot.lock().unwrap() = Some(*config);
        Ok(())
    }
}
