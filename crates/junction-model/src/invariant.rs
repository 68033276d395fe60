use junction_ir::types::{Direction, Remaining, SignalPhase, TimingConfig};

use crate::state::EngineState;

/// A violation found during invariant checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: &'static str,
    pub message: String,
}

/// Check the engine invariants against a state between handlers.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_invariants(state: &EngineState, config: &TimingConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    if state.is_emergency_mode {
        if state.current_direction != Direction::North
            || state.phase != SignalPhase::Green
            || state.seconds_remaining != Remaining::Unbounded
        {
            violations.push(Violation {
                rule: "emergency_holds_north",
                message: format!(
                    "Emergency mode shows {} {} with {} remaining",
                    state.current_direction, state.phase, state.seconds_remaining
                ),
            });
        }
    } else if state.seconds_remaining.is_unbounded() {
        violations.push(Violation {
            rule: "bounded_outside_emergency",
            message: "Unbounded countdown outside emergency mode".to_string(),
        });
    }

    if state.sequence_index >= Direction::SEQUENCE.len() {
        violations.push(Violation {
            rule: "sequence_index_in_range",
            message: format!("Sequence index {} out of range", state.sequence_index),
        });
    } else if !state.is_manual_override
        && !state.is_emergency_mode
        && state.phase != SignalPhase::Red
    {
        let expected = Direction::from_index(state.sequence_index);
        if state.current_direction != expected || state.next_direction != expected.following() {
            violations.push(Violation {
                rule: "automatic_tracks_sequence",
                message: format!(
                    "Automatic mode at index {} expects {} then {}, found {} then {}",
                    state.sequence_index,
                    expected,
                    expected.following(),
                    state.current_direction,
                    state.next_direction
                ),
            });
        }
    }

    if !config.is_within_bounds() {
        violations.push(Violation {
            rule: "config_within_bounds",
            message: format!("Timing configuration out of range: {config:?}"),
        });
    }

    violations
}
