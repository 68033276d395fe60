use std::collections::HashMap;

use junction_ir::types::{Direction, TimingConfig};

use crate::congestion::CongestionModel;
use crate::engine::SignalEngine;
use crate::invariant::check_invariants;
use crate::state::{EngineState, TraceEntry};

/// An operator action injected at a given tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedEvent {
    Override(Direction),
    ToggleEmergency,
    Reset,
    SetCongestion(Direction, u8),
    Configure(TimingConfig),
}

#[derive(Debug)]
pub struct SimulationConfig {
    pub max_ticks: u64,
    pub timing: TimingConfig,
    /// Starting congestion per direction, in sequence order.
    pub congestion: [u8; 4],
    /// Events applied before the tick with the same number; stable order.
    pub script: Vec<(u64, ScriptedEvent)>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: 600,
            timing: TimingConfig::default(),
            congestion: [crate::congestion::BASELINE_LEVEL; 4],
            script: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct SimulationResult {
    pub ticks_executed: u64,
    pub transitions: Vec<TraceEntry>,
    /// Number of greens handed to each direction.
    pub greens_served: HashMap<Direction, u32>,
    pub final_state: EngineState,
    pub violations: Vec<String>,
}

/// Simulate a junction session without a host runtime.
///
/// Starts the engine, then for every tick applies the scripted events
/// scheduled for it and delivers one timer callback to whatever timer is
/// armed. Invariants are checked after every step.
pub fn simulate(config: &SimulationConfig) -> SimulationResult {
    let mut congestion = CongestionModel::new();
    for (direction, level) in Direction::SEQUENCE.iter().zip(config.congestion) {
        congestion.set_level(*direction, level as i64);
    }

    let mut engine = SignalEngine::with_trace_capacity(config.timing, usize::MAX);
    let mut violations = Vec::new();

    engine.start(&congestion);
    collect_violations(&engine, 0, &mut violations);

    let mut script = config.script.iter().peekable();
    let mut ticks_executed = 0;

    for tick in 0..config.max_ticks {
        while let Some((_, event)) = script.next_if(|(at, _)| *at <= tick) {
            apply_event(&mut engine, &mut congestion, event);
            collect_violations(&engine, tick, &mut violations);
        }

        if let Some(armed) = engine.armed_timer() {
            engine.on_timer(armed.token, &congestion);
        }
        ticks_executed += 1;
        collect_violations(&engine, tick, &mut violations);
    }

    let transitions = engine.trace();
    let mut greens_served = HashMap::new();
    for entry in transitions.iter().filter(|e| e.transition.opens_green()) {
        *greens_served.entry(entry.direction).or_insert(0) += 1;
    }

    SimulationResult {
        ticks_executed,
        transitions,
        greens_served,
        final_state: engine.state().clone(),
        violations,
    }
}

fn apply_event(engine: &mut SignalEngine, congestion: &mut CongestionModel, event: &ScriptedEvent) {
    match event {
        ScriptedEvent::Override(direction) => {
            engine.request_manual_override(*direction, congestion);
        }
        ScriptedEvent::ToggleEmergency => {
            engine.toggle_emergency_mode(congestion);
        }
        ScriptedEvent::Reset => engine.reset_to_automatic(congestion),
        ScriptedEvent::SetCongestion(direction, level) => {
            congestion.set_level(*direction, *level as i64);
            if *direction == engine.state().current_direction {
                engine.restart_countdown(congestion);
            }
        }
        ScriptedEvent::Configure(timing) => {
            engine.set_config(*timing);
            engine.reset_to_automatic(congestion);
        }
    }
}

fn collect_violations(engine: &SignalEngine, tick: u64, out: &mut Vec<String>) {
    for v in check_invariants(engine.state(), engine.config()) {
        out.push(format!("tick {tick}: {}: {}", v.rule, v.message));
    }
}
