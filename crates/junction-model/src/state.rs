use serde::Serialize;

use junction_ir::types::{Direction, Remaining, SignalPhase};

/// Observable state of one junction controller.
///
/// Exactly one direction is non-red at a time. Every other direction is
/// implicitly `Red`; see [`EngineState::phase_of`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub current_direction: Direction,
    pub next_direction: Direction,
    pub phase: SignalPhase,
    pub seconds_remaining: Remaining,
    pub sequence_index: usize,
    pub is_manual_override: bool,
    pub is_emergency_mode: bool,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            current_direction: Direction::North,
            next_direction: Direction::North.following(),
            phase: SignalPhase::Red,
            seconds_remaining: Remaining::Seconds(0),
            sequence_index: 0,
            is_manual_override: false,
            is_emergency_mode: false,
        }
    }

    /// Indicator shown for `direction`.
    pub fn phase_of(&self, direction: Direction) -> SignalPhase {
        if direction == self.current_direction {
            self.phase
        } else {
            SignalPhase::Red
        }
    }

    pub fn mode(&self) -> ControlMode {
        if self.is_emergency_mode {
            ControlMode::Emergency
        } else if self.is_manual_override {
            ControlMode::Manual
        } else {
            ControlMode::Automatic
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Who is choosing the next direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Automatic,
    Manual,
    Emergency,
}

/// Identity of an armed timer. A callback carrying any other token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// One-second countdown of the green phase.
    GreenCountdown,
    /// Fixed-length yellow hold before the next green.
    YellowHold,
}

/// The single timer an engine may have armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArmedTimer {
    pub token: TimerToken,
    pub kind: TimerKind,
}

/// Named transitions of the signal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Initial green of a session.
    Start,
    /// Green countdown reached zero.
    GreenExpired,
    /// Override request truncated the green.
    OverrideCut,
    /// Yellow hold ended and the next direction went green.
    YellowExpired,
    /// Override applied with no active green or yellow to clear.
    DirectSwitch,
    EmergencyEntered,
    EmergencyCleared,
    /// Active green re-armed with a refreshed duration.
    CountdownRestarted,
    ResetToAutomatic,
}

impl Transition {
    /// Whether this transition hands green to a (possibly new) direction.
    pub fn opens_green(self) -> bool {
        matches!(
            self,
            Transition::Start
                | Transition::YellowExpired
                | Transition::DirectSwitch
                | Transition::EmergencyEntered
        )
    }
}

/// A trace entry recording a transition that was executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub transition: Transition,
    pub direction: Direction,
    pub phase: SignalPhase,
    pub remaining: Remaining,
    pub mode: ControlMode,
    pub generation: u64,
}
