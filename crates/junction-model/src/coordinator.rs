//! Operator interventions: manual override, emergency preemption and
//! return to automatic sequencing.

use serde::Serialize;

use junction_ir::types::{Direction, SignalPhase};

use crate::congestion::CongestionModel;
use crate::engine::SignalEngine;
use crate::state::Transition;

/// What a manual override request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideOutcome {
    /// The requested direction already has the signal.
    AlreadyActive,
    /// Emergency mode holds the junction; the request was dropped.
    SuppressedByEmergency,
    /// The active green was cut short into yellow.
    CutToYellow { from: Direction },
    /// A yellow was already running; the request becomes its successor.
    QueuedBehindYellow,
    /// Nothing was lit, so the requested direction went green at once.
    SwitchedImmediately,
}

impl OverrideOutcome {
    /// Whether the request changed engine state.
    pub fn is_applied(self) -> bool {
        !matches!(
            self,
            OverrideOutcome::AlreadyActive | OverrideOutcome::SuppressedByEmergency
        )
    }
}

impl SignalEngine {
    /// Force `direction` to be the next green.
    pub fn request_manual_override(
        &mut self,
        direction: Direction,
        congestion: &CongestionModel,
    ) -> OverrideOutcome {
        if direction == self.state.current_direction {
            tracing::debug!(direction = %direction, "override for active direction ignored");
            return OverrideOutcome::AlreadyActive;
        }
        if self.state.is_emergency_mode {
            tracing::warn!(direction = %direction, "override dropped during emergency hold");
            return OverrideOutcome::SuppressedByEmergency;
        }

        self.state.is_manual_override = true;
        self.state.next_direction = direction;

        let outcome = match self.state.phase {
            SignalPhase::Green => {
                let from = self.state.current_direction;
                self.begin_yellow();
                self.record(Transition::OverrideCut);
                OverrideOutcome::CutToYellow { from }
            }
            // The armed yellow hold already ends in the next direction.
            SignalPhase::Yellow => OverrideOutcome::QueuedBehindYellow,
            SignalPhase::Red => {
                self.enter_green(direction, congestion);
                self.record(Transition::DirectSwitch);
                OverrideOutcome::SwitchedImmediately
            }
        };
        tracing::info!(direction = %direction, outcome = ?outcome, "manual override");
        outcome
    }

    /// Flip emergency mode. Returns the new mode.
    ///
    /// Entering holds north green indefinitely with all timers cleared.
    /// Leaving clears both override flags and resumes automatic sequencing
    /// from the current direction.
    pub fn toggle_emergency_mode(&mut self, congestion: &CongestionModel) -> bool {
        if self.state.is_emergency_mode {
            self.state.is_emergency_mode = false;
            self.state.is_manual_override = false;
            self.record(Transition::EmergencyCleared);
            self.reset_to_automatic(congestion);
            tracing::info!(direction = %self.state.current_direction, "emergency mode cleared");
            false
        } else {
            self.state.is_emergency_mode = true;
            self.hold_emergency();
            self.record(Transition::EmergencyEntered);
            tracing::warn!("emergency mode: north held green");
            true
        }
    }

    /// Drop any override or emergency and restart the automatic cycle at
    /// the current direction with a fresh countdown.
    pub fn reset_to_automatic(&mut self, congestion: &CongestionModel) {
        self.state.is_manual_override = false;
        self.state.is_emergency_mode = false;
        self.disarm();

        let current = self.state.current_direction;
        self.state.sequence_index = current.index();
        self.state.next_direction = current.following();
        self.enter_green(current, congestion);
        self.record(Transition::ResetToAutomatic);
    }
}
