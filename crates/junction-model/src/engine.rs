//! Signal timing engine.
//!
//! A tick-driven state machine that cycles the four directions through
//! green → yellow → (red, next green). The host delivers one-second timer
//! callbacks through [`SignalEngine::on_timer`]; every callback carries the
//! [`TimerToken`] it was scheduled for, and callbacks for a timer that has
//! since been replaced are ignored.
//!
//! The engine assumes a single writer. Handlers run to completion one at a
//! time; a multi-threaded host must put the engine behind a mutex or an
//! actor.

use std::collections::VecDeque;

use junction_ir::types::{Direction, Remaining, SignalPhase, TimingConfig};

use crate::congestion::CongestionModel;
use crate::state::{ArmedTimer, EngineState, TimerKind, TimerToken, TraceEntry, Transition};

/// Default number of trace entries retained.
pub const DEFAULT_TRACE_CAPACITY: usize = 512;

pub struct SignalEngine {
    pub(crate) state: EngineState,
    pub(crate) config: TimingConfig,
    /// At most one timer is armed at any time.
    armed: Option<ArmedTimer>,
    next_token: u64,
    /// Monotonic generation counter, incremented on every transition.
    generation: u64,
    trace: VecDeque<TraceEntry>,
    trace_capacity: usize,
}

impl SignalEngine {
    pub fn new(config: TimingConfig) -> Self {
        Self::with_trace_capacity(config, DEFAULT_TRACE_CAPACITY)
    }

    pub fn with_trace_capacity(config: TimingConfig, trace_capacity: usize) -> Self {
        Self {
            state: EngineState::new(),
            config: within_bounds(config),
            armed: None,
            next_token: 1,
            generation: 0,
            trace: VecDeque::new(),
            trace_capacity,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    /// Replace the timing configuration, clamped into range. Takes effect
    /// at the next green; callers wanting it immediately follow up with a
    /// reset.
    pub fn set_config(&mut self, config: TimingConfig) {
        self.config = within_bounds(config);
    }

    pub fn armed_timer(&self) -> Option<ArmedTimer> {
        self.armed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Retained transitions, oldest first.
    pub fn trace(&self) -> Vec<TraceEntry> {
        self.trace.iter().cloned().collect()
    }

    /// Green time granted to `direction`:
    /// `base + congestion(direction) * weight`.
    pub fn green_duration(&self, direction: Direction, congestion: &CongestionModel) -> u32 {
        self.config.base_time_secs + congestion.level(direction) as u32 * self.config.congestion_weight
    }

    /// Arm the first green for the current direction.
    pub fn start(&mut self, congestion: &CongestionModel) -> Transition {
        if let Some(armed) = self.armed {
            tracing::warn!(token = armed.token.0, "start while a timer is armed; disarming it");
        }
        let direction = self.state.current_direction;
        self.enter_green(direction, congestion);
        self.record(Transition::Start);
        tracing::info!(
            direction = %direction,
            seconds = %self.state.seconds_remaining,
            "signal engine started"
        );
        Transition::Start
    }

    /// Deliver a one-second timer callback.
    ///
    /// Returns the transition the tick caused, or `None` when the tick only
    /// decremented the countdown or `token` no longer names the armed timer.
    pub fn on_timer(&mut self, token: TimerToken, congestion: &CongestionModel) -> Option<Transition> {
        let armed = match self.armed {
            Some(armed) if armed.token == token => armed,
            _ => {
                tracing::trace!(token = token.0, "stale timer callback ignored");
                return None;
            }
        };

        let left = match self.state.seconds_remaining {
            Remaining::Seconds(s) => s.saturating_sub(1),
            Remaining::Unbounded => {
                // Emergency holds never arm a timer.
                self.disarm();
                return None;
            }
        };
        self.state.seconds_remaining = Remaining::Seconds(left);
        if left > 0 {
            return None;
        }

        match armed.kind {
            TimerKind::GreenCountdown => {
                self.begin_yellow();
                Some(self.record(Transition::GreenExpired))
            }
            TimerKind::YellowHold => {
                self.advance(congestion);
                Some(self.record(Transition::YellowExpired))
            }
        }
    }

    /// Re-arm the active green with a freshly computed duration.
    ///
    /// Only applies to an automatic green; returns whether it restarted.
    pub fn restart_countdown(&mut self, congestion: &CongestionModel) -> bool {
        if self.state.phase != SignalPhase::Green
            || self.state.is_manual_override
            || self.state.is_emergency_mode
        {
            return false;
        }
        let direction = self.state.current_direction;
        self.enter_green(direction, congestion);
        self.record(Transition::CountdownRestarted);
        true
    }

    pub(crate) fn enter_green(&mut self, direction: Direction, congestion: &CongestionModel) {
        self.disarm();
        let seconds = self.green_duration(direction, congestion);
        self.state.current_direction = direction;
        self.state.phase = SignalPhase::Green;
        self.state.seconds_remaining = Remaining::Seconds(seconds);
        self.arm(TimerKind::GreenCountdown);
    }

    pub(crate) fn begin_yellow(&mut self) {
        self.disarm();
        self.state.phase = SignalPhase::Yellow;
        self.state.seconds_remaining = Remaining::Seconds(self.config.yellow_time_secs);
        self.arm(TimerKind::YellowHold);
    }

    /// Yellow → red → next green, as one step. Automatic mode follows the
    /// fixed sequence; manual mode jumps to the requested direction and
    /// keeps holding it.
    fn advance(&mut self, congestion: &CongestionModel) {
        let next = if self.state.is_manual_override {
            self.state.next_direction
        } else {
            self.state.sequence_index = (self.state.sequence_index + 1) % Direction::SEQUENCE.len();
            self.state.next_direction = Direction::from_index(self.state.sequence_index + 1);
            Direction::from_index(self.state.sequence_index)
        };
        self.enter_green(next, congestion);
    }

    /// Hold `Direction::North` green with no deadline.
    pub(crate) fn hold_emergency(&mut self) {
        self.disarm();
        self.state.current_direction = Direction::North;
        self.state.phase = SignalPhase::Green;
        self.state.seconds_remaining = Remaining::Unbounded;
    }

    fn arm(&mut self, kind: TimerKind) -> TimerToken {
        if let Some(previous) = self.armed.take() {
            tracing::error!(
                token = previous.token.0,
                kind = ?previous.kind,
                "timer still armed while arming another; disarmed"
            );
        }
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.armed = Some(ArmedTimer { token, kind });
        token
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = None;
    }

    pub(crate) fn record(&mut self, transition: Transition) -> Transition {
        self.generation += 1;
        let entry = TraceEntry {
            transition,
            direction: self.state.current_direction,
            phase: self.state.phase,
            remaining: self.state.seconds_remaining,
            mode: self.state.mode(),
            generation: self.generation,
        };
        tracing::debug!(
            transition = ?transition,
            direction = %entry.direction,
            phase = %entry.phase,
            remaining = %entry.remaining,
            generation = entry.generation,
            "signal transition"
        );
        if self.trace_capacity > 0 {
            if self.trace.len() == self.trace_capacity {
                self.trace.pop_front();
            }
            self.trace.push_back(entry);
        }
        transition
    }
}

/// Clamp `config` into the permitted ranges, logging every field that moved.
fn within_bounds(config: TimingConfig) -> TimingConfig {
    let (config, adjustments) = config.clamped();
    for adj in &adjustments {
        tracing::warn!(
            field = adj.field,
            requested = adj.requested,
            applied = adj.applied,
            "timing setting out of range, clamped"
        );
    }
    config
}
