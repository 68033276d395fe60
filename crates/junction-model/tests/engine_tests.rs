use junction_ir::types::{Direction, Remaining, SignalPhase, TimingConfig};
use junction_model::congestion::CongestionModel;
use junction_model::engine::SignalEngine;
use junction_model::state::{TimerKind, Transition};

fn scenario_config() -> TimingConfig {
    TimingConfig {
        base_time_secs: 20,
        congestion_weight: 5,
        yellow_time_secs: 3,
    }
}

fn tick(engine: &mut SignalEngine, congestion: &CongestionModel) -> Option<Transition> {
    let armed = engine.armed_timer().expect("a timer should be armed");
    engine.on_timer(armed.token, congestion)
}

fn tick_n(engine: &mut SignalEngine, congestion: &CongestionModel, n: u32) {
    for _ in 0..n {
        tick(engine, congestion);
    }
}

#[test]
fn test_new_engine_is_idle_at_north() {
    let engine = SignalEngine::new(TimingConfig::default());
    let state = engine.state();
    assert_eq!(state.current_direction, Direction::North);
    assert_eq!(state.next_direction, Direction::East);
    assert_eq!(state.phase, SignalPhase::Red);
    assert_eq!(state.sequence_index, 0);
    assert!(engine.armed_timer().is_none());
    assert_eq!(engine.generation(), 0);
}

#[test]
fn test_green_duration_formula() {
    let engine = SignalEngine::new(scenario_config());
    let mut congestion = CongestionModel::new();
    congestion.set_level(Direction::East, 7);
    congestion.set_level(Direction::West, 0);

    assert_eq!(engine.green_duration(Direction::North, &congestion), 30);
    assert_eq!(engine.green_duration(Direction::East, &congestion), 55);
    assert_eq!(engine.green_duration(Direction::West, &congestion), 20);
}

#[test]
fn test_green_yellow_green_scenario() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();

    assert_eq!(engine.start(&congestion), Transition::Start);
    assert_eq!(engine.state().phase, SignalPhase::Green);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(30));

    tick_n(&mut engine, &congestion, 29);
    assert_eq!(engine.state().phase, SignalPhase::Green);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(1));

    assert_eq!(tick(&mut engine, &congestion), Some(Transition::GreenExpired));
    assert_eq!(engine.state().current_direction, Direction::North);
    assert_eq!(engine.state().phase, SignalPhase::Yellow);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(3));
    assert_eq!(engine.armed_timer().unwrap().kind, TimerKind::YellowHold);

    tick_n(&mut engine, &congestion, 2);
    assert_eq!(engine.state().phase, SignalPhase::Yellow);
    assert_eq!(tick(&mut engine, &congestion), Some(Transition::YellowExpired));

    let state = engine.state();
    assert_eq!(state.current_direction, Direction::East);
    assert_eq!(state.phase, SignalPhase::Green);
    assert_eq!(state.next_direction, Direction::South);
    assert_eq!(state.sequence_index, 1);
    assert_eq!(state.seconds_remaining, Remaining::Seconds(30));
}

#[test]
fn test_full_cycle_returns_to_start() {
    let mut engine = SignalEngine::new(scenario_config());
    let mut congestion = CongestionModel::new();
    congestion.set_level(Direction::South, 9);
    engine.start(&congestion);

    let mut advances = 0;
    let mut visited = Vec::new();
    while advances < 4 {
        if tick(&mut engine, &congestion) == Some(Transition::YellowExpired) {
            advances += 1;
            visited.push(engine.state().current_direction);
        }
    }

    assert_eq!(
        visited,
        vec![
            Direction::East,
            Direction::South,
            Direction::West,
            Direction::North
        ]
    );
    assert_eq!(engine.state().sequence_index, 0);
    assert_eq!(engine.state().phase, SignalPhase::Green);
}

#[test]
fn test_full_cycle_from_any_direction() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);
    engine.request_manual_override(Direction::South, &congestion);
    tick_n(&mut engine, &congestion, 3);
    assert_eq!(engine.state().current_direction, Direction::South);

    engine.reset_to_automatic(&congestion);
    assert_eq!(engine.state().sequence_index, 2);

    let mut advances = 0;
    while advances < 4 {
        if tick(&mut engine, &congestion) == Some(Transition::YellowExpired) {
            advances += 1;
        }
    }
    assert_eq!(engine.state().current_direction, Direction::South);
    assert_eq!(engine.state().sequence_index, 2);
}

#[test]
fn test_stale_timer_callback_is_noop() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);

    let countdown = engine.armed_timer().unwrap().token;
    tick_n(&mut engine, &congestion, 30);
    assert_eq!(engine.state().phase, SignalPhase::Yellow);

    let before = engine.state().clone();
    let generation = engine.generation();
    assert_eq!(engine.on_timer(countdown, &congestion), None);
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.generation(), generation);
}

#[test]
fn test_green_expiry_triggers_exactly_once() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);
    let countdown = engine.armed_timer().unwrap().token;

    let mut expiries = 0;
    for _ in 0..40 {
        if engine.on_timer(countdown, &congestion) == Some(Transition::GreenExpired) {
            expiries += 1;
        }
    }
    assert_eq!(expiries, 1);
    assert_eq!(engine.state().phase, SignalPhase::Yellow);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(3));
}

#[test]
fn test_restart_countdown_uses_new_congestion() {
    let mut engine = SignalEngine::new(scenario_config());
    let mut congestion = CongestionModel::new();
    engine.start(&congestion);
    tick_n(&mut engine, &congestion, 5);
    let old = engine.armed_timer().unwrap().token;

    congestion.set_level(Direction::North, 6);
    assert!(engine.restart_countdown(&congestion));
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(50));

    let new = engine.armed_timer().unwrap().token;
    assert_ne!(old, new);
    assert_eq!(engine.on_timer(old, &congestion), None);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(50));
}

#[test]
fn test_restart_countdown_skips_yellow_and_manual() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);
    tick_n(&mut engine, &congestion, 30);
    assert!(!engine.restart_countdown(&congestion));
    assert_eq!(engine.state().phase, SignalPhase::Yellow);

    tick_n(&mut engine, &congestion, 3);
    engine.request_manual_override(Direction::West, &congestion);
    tick_n(&mut engine, &congestion, 3);
    assert_eq!(engine.state().current_direction, Direction::West);
    assert!(!engine.restart_countdown(&congestion));
}

#[test]
fn test_config_change_applies_on_next_green() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);

    engine.set_config(TimingConfig {
        base_time_secs: 40,
        congestion_weight: 1,
        yellow_time_secs: 2,
    });
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(30));

    tick_n(&mut engine, &congestion, 30);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(2));
    tick_n(&mut engine, &congestion, 2);
    assert_eq!(engine.state().current_direction, Direction::East);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(42));
}

#[test]
fn test_restart_before_expiry_disarms_previous_timer() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);
    let first = engine.armed_timer().unwrap().token;

    engine.start(&congestion);
    let second = engine.armed_timer().unwrap().token;
    assert_ne!(first, second);
    assert_eq!(engine.on_timer(first, &congestion), None);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(30));
}

#[test]
fn test_trace_records_transitions_with_generations() {
    let mut engine = SignalEngine::new(scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);
    tick_n(&mut engine, &congestion, 33);

    let trace = engine.trace();
    let transitions: Vec<Transition> = trace.iter().map(|e| e.transition).collect();
    assert_eq!(
        transitions,
        vec![
            Transition::Start,
            Transition::GreenExpired,
            Transition::YellowExpired
        ]
    );
    let generations: Vec<u64> = trace.iter().map(|e| e.generation).collect();
    assert_eq!(generations, vec![1, 2, 3]);
}

#[test]
fn test_trace_capacity_evicts_oldest() {
    let mut engine = SignalEngine::with_trace_capacity(scenario_config(), 2);
    let congestion = CongestionModel::new();
    engine.start(&congestion);
    tick_n(&mut engine, &congestion, 33);

    let trace = engine.trace();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0].transition, Transition::GreenExpired);
    assert_eq!(engine.generation(), 3);
}

#[test]
fn test_out_of_range_config_is_clamped() {
    // Zero fields fall back to the defaults.
    let mut engine = SignalEngine::new(TimingConfig {
        base_time_secs: 0,
        congestion_weight: 0,
        yellow_time_secs: 0,
    });
    assert_eq!(*engine.config(), scenario_config());
    let congestion = CongestionModel::new();
    engine.start(&congestion);
    assert_eq!(engine.state().seconds_remaining, Remaining::Seconds(30));

    engine.set_config(TimingConfig {
        base_time_secs: 500,
        congestion_weight: 99,
        yellow_time_secs: 40,
    });
    let config = engine.config();
    assert_eq!(config.base_time_secs, 60);
    assert_eq!(config.congestion_weight, 10);
    assert_eq!(config.yellow_time_secs, 10);
    assert!(config.is_within_bounds());
}
