//! Cross-context override relay.
//!
//! A page that is not running the controller (for example the ambulance
//! routing view) cannot call into the engine directly. It leaves a request
//! in a single-slot mailbox instead, and the controller takes it once at
//! startup. Delivery is at-most-once and last-write-wins: a second write
//! before the read replaces the first, and a taken request is gone.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use junction_ir::types::{Direction, GeoPoint};

use crate::persist::{sibling_path, write_atomically};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Mailbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mailbox slot is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// An override request waiting in the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOverride {
    pub direction: Direction,
    /// Unix time of the write, in milliseconds.
    pub requested_at_ms: u64,
}

impl PendingOverride {
    pub fn now(direction: Direction) -> Self {
        let requested_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            direction,
            requested_at_ms,
        }
    }
}

/// Durable single-slot handoff between execution contexts.
pub trait OverrideMailbox: Send {
    /// Leave a request, replacing any unread one.
    fn write_pending_override(&self, direction: Direction) -> Result<(), RelayError>;

    /// Read and clear the slot in one step.
    fn take_pending_override(&self) -> Result<Option<PendingOverride>, RelayError>;
}

/// Mailbox slot stored as a JSON file.
///
/// Writes land in a temporary file renamed over the slot. Takes rename the
/// slot to a private claim file before reading it, so two readers can never
/// both receive the same request.
#[derive(Debug, Clone)]
pub struct FileMailbox {
    path: PathBuf,
}

impl FileMailbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OverrideMailbox for FileMailbox {
    fn write_pending_override(&self, direction: Direction) -> Result<(), RelayError> {
        let json = serde_json::to_vec(&PendingOverride::now(direction))?;
        write_atomically(&self.path, &json)?;
        tracing::info!(direction = %direction, path = %self.path.display(), "pending override written");
        Ok(())
    }

    fn take_pending_override(&self) -> Result<Option<PendingOverride>, RelayError> {
        let claim = sibling_path(&self.path, "claim");
        match std::fs::rename(&self.path, &claim) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let text = std::fs::read(&claim);
        if let Err(e) = std::fs::remove_file(&claim) {
            tracing::warn!(path = %claim.display(), error = %e, "failed to remove claimed mailbox slot");
        }
        let pending = serde_json::from_slice(&text?)?;
        Ok(Some(pending))
    }
}

/// Mailbox slot held in memory. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailbox {
    slot: Arc<Mutex<Option<PendingOverride>>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverrideMailbox for MemoryMailbox {
    fn write_pending_override(&self, direction: Direction) -> Result<(), RelayError> {
        *self.slot.lock().unwrap() = Some(PendingOverride::now(direction));
        Ok(())
    }

    fn take_pending_override(&self) -> Result<Option<PendingOverride>, RelayError> {
        Ok(self.slot.lock().unwrap().take())
    }
}

/// Direction of travel for a route: the dominant axis of its displacement.
pub fn route_direction(start: GeoPoint, end: GeoPoint) -> Direction {
    let lat_diff = end.lat - start.lat;
    let lng_diff = end.lng - start.lng;
    if lat_diff.abs() > lng_diff.abs() {
        if lat_diff > 0.0 {
            Direction::North
        } else {
            Direction::South
        }
    } else if lng_diff > 0.0 {
        Direction::East
    } else {
        Direction::West
    }
}
