//! Operator read-outs.
//!
//! The core only emits typed state. Whatever draws the junction supplies
//! its own per-direction render targets through [`LampTargets`].

use serde::Serialize;

use junction_ir::types::{CongestionBand, Direction, SignalPhase, TimingConfig};
use junction_model::congestion::CongestionModel;
use junction_model::state::{ControlMode, EngineState};

use crate::incidents::IncidentLedger;

/// Everything the operator console shows.
#[derive(Debug, Clone, Serialize)]
pub struct SignalReadout {
    /// e.g. `"East"`, or `"North (Emergency)"`.
    pub current: String,
    /// Next direction label, `"N/A"` during emergency.
    pub next: String,
    /// Seconds left, `"∞"` during emergency.
    pub countdown: String,
    pub phase: SignalPhase,
    pub mode: ControlMode,
    pub timing: TimingConfig,
    pub lamps: Vec<LampReadout>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LampReadout {
    pub direction: Direction,
    pub phase: SignalPhase,
    /// Only the active direction shows a countdown.
    pub countdown: Option<String>,
    pub congestion_level: u8,
    pub congestion_band: CongestionBand,
    pub incidents: u32,
}

pub fn build_readout(
    state: &EngineState,
    congestion: &CongestionModel,
    incidents: &IncidentLedger,
    timing: &TimingConfig,
) -> SignalReadout {
    let countdown = state.seconds_remaining.to_string();
    let (current, next) = if state.is_emergency_mode {
        (
            format!("{} (Emergency)", state.current_direction.label()),
            "N/A".to_string(),
        )
    } else {
        (
            state.current_direction.label().to_string(),
            state.next_direction.label().to_string(),
        )
    };

    let lamps = Direction::SEQUENCE
        .iter()
        .map(|&direction| LampReadout {
            direction,
            phase: state.phase_of(direction),
            countdown: (direction == state.current_direction).then(|| countdown.clone()),
            congestion_level: congestion.level(direction),
            congestion_band: congestion.band(direction),
            incidents: incidents.count(direction),
        })
        .collect();

    SignalReadout {
        current,
        next,
        countdown,
        phase: state.phase,
        mode: state.mode(),
        timing: *timing,
        lamps,
    }
}

/// Per-direction render targets owned by the UI layer.
#[derive(Debug, Clone)]
pub struct LampTargets<T> {
    pub north: T,
    pub east: T,
    pub south: T,
    pub west: T,
}

impl<T> LampTargets<T> {
    pub fn get(&self, direction: Direction) -> &T {
        match direction {
            Direction::North => &self.north,
            Direction::East => &self.east,
            Direction::South => &self.south,
            Direction::West => &self.west,
        }
    }

    /// Call `draw` once per lamp with that direction's target.
    pub fn render<F>(&self, readout: &SignalReadout, mut draw: F)
    where
        F: FnMut(&T, &LampReadout),
    {
        for lamp in &readout.lamps {
            draw(self.get(lamp.direction), lamp);
        }
    }
}
