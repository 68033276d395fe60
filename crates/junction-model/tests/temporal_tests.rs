use junction_ir::types::{Direction, Remaining, SignalPhase};
use junction_model::state::{ControlMode, TraceEntry, Transition};
use junction_model::temporal::{check_temporal, TemporalRule};

fn make_trace(entries: &[(Transition, Direction, SignalPhase, ControlMode)]) -> Vec<TraceEntry> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (transition, direction, phase, mode))| TraceEntry {
            transition: *transition,
            direction: *direction,
            phase: *phase,
            remaining: Remaining::Seconds(1),
            mode: *mode,
            generation: i as u64 + 1,
        })
        .collect()
}

use junction_ir::types::Direction::{East, North, South, West};
use junction_ir::types::SignalPhase::{Green, Yellow};
use junction_model::state::ControlMode::{Automatic, Emergency, Manual};

#[test]
fn test_clean_automatic_trace_passes() {
    let trace = make_trace(&[
        (Transition::Start, North, Green, Automatic),
        (Transition::GreenExpired, North, Yellow, Automatic),
        (Transition::YellowExpired, East, Green, Automatic),
        (Transition::GreenExpired, East, Yellow, Automatic),
        (Transition::YellowExpired, South, Green, Automatic),
    ]);
    let violations = check_temporal(
        &trace,
        &[TemporalRule::YellowBeforeSwitch, TemporalRule::RoundRobin],
    );
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn test_switch_without_yellow_is_flagged() {
    let trace = make_trace(&[
        (Transition::Start, North, Green, Automatic),
        (Transition::YellowExpired, East, Green, Automatic),
    ]);
    let violations = check_temporal(&trace, &[TemporalRule::YellowBeforeSwitch]);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].rule_name, "yellow_before_switch");
    assert_eq!(violations[0].trace_index, 1);
}

#[test]
fn test_emergency_and_direct_switch_are_exempt() {
    let trace = make_trace(&[
        (Transition::Start, East, Green, Automatic),
        (Transition::EmergencyEntered, North, Green, Emergency),
        (Transition::EmergencyCleared, North, Green, Automatic),
        (Transition::DirectSwitch, West, Green, Manual),
    ]);
    let violations = check_temporal(&trace, &[TemporalRule::YellowBeforeSwitch]);
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn test_automatic_skip_breaks_round_robin() {
    let trace = make_trace(&[
        (Transition::GreenExpired, North, Yellow, Automatic),
        (Transition::YellowExpired, South, Green, Automatic),
    ]);
    let violations = check_temporal(&trace, &[TemporalRule::RoundRobin]);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].message.contains("expected east"));
}

#[test]
fn test_manual_jump_is_not_round_robin() {
    let trace = make_trace(&[
        (Transition::OverrideCut, North, Yellow, Manual),
        (Transition::YellowExpired, West, Green, Manual),
    ]);
    let violations = check_temporal(&trace, &[TemporalRule::RoundRobin]);
    assert!(violations.is_empty());
}
