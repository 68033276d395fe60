//! Session statistics.
//!
//! Counts how the signal was shared out and how often operators stepped
//! in, for the status read-out.

use std::collections::BTreeMap;

use serde::Serialize;

use junction_ir::types::Direction;
use junction_model::coordinator::OverrideOutcome;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SignalStats {
    /// Greens handed to each direction.
    pub greens_served: BTreeMap<Direction, u32>,
    /// Sum of the green durations granted at the start of each green.
    pub green_seconds_granted: u64,
    pub overrides_applied: u32,
    pub overrides_ignored: u32,
    pub emergency_activations: u32,
    pub incidents_ingested: u32,
    pub invariant_violations: u32,
}

impl SignalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a green handed to `direction` for `seconds` (`None` when unbounded).
    pub fn record_green(&mut self, direction: Direction, seconds: Option<u32>) {
        *self.greens_served.entry(direction).or_insert(0) += 1;
        if let Some(seconds) = seconds {
            self.green_seconds_granted += seconds as u64;
        }
    }

    pub fn record_override(&mut self, outcome: OverrideOutcome) {
        if outcome.is_applied() {
            self.overrides_applied += 1;
        } else {
            self.overrides_ignored += 1;
        }
    }

    pub fn greens_for(&self, direction: Direction) -> u32 {
        self.greens_served.get(&direction).copied().unwrap_or(0)
    }
}
