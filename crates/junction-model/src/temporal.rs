use junction_ir::types::SignalPhase;

use crate::state::{ControlMode, TraceEntry, Transition};

/// A temporal rule to check against a transition trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalRule {
    /// "A direction loses the signal only after showing yellow."
    /// Start, direct switches and emergency preemption are exempt.
    YellowBeforeSwitch,

    /// "Automatic advances visit directions in the fixed order."
    RoundRobin,
}

impl TemporalRule {
    pub fn name(self) -> &'static str {
        match self {
            TemporalRule::YellowBeforeSwitch => "yellow_before_switch",
            TemporalRule::RoundRobin => "round_robin",
        }
    }
}

/// A temporal violation.
#[derive(Debug, Clone)]
pub struct TemporalViolation {
    pub rule_name: String,
    pub message: String,
    pub trace_index: usize,
}

/// Check temporal properties against a transition trace.
pub fn check_temporal(trace: &[TraceEntry], rules: &[TemporalRule]) -> Vec<TemporalViolation> {
    let mut violations = Vec::new();

    for rule in rules {
        match rule {
            TemporalRule::YellowBeforeSwitch => {
                check_yellow_before_switch(trace, rule.name(), &mut violations)
            }
            TemporalRule::RoundRobin => check_round_robin(trace, rule.name(), &mut violations),
        }
    }

    violations
}

fn check_yellow_before_switch(
    trace: &[TraceEntry],
    rule_name: &str,
    violations: &mut Vec<TemporalViolation>,
) {
    for (i, pair) in trace.windows(2).enumerate() {
        let (prev, entry) = (&pair[0], &pair[1]);
        if entry.direction == prev.direction {
            continue;
        }
        if matches!(
            entry.transition,
            Transition::Start | Transition::DirectSwitch | Transition::EmergencyEntered
        ) {
            continue;
        }
        if prev.phase != SignalPhase::Yellow {
            violations.push(TemporalViolation {
                rule_name: rule_name.to_string(),
                message: format!(
                    "Signal moved from {} to {} via {:?} without a yellow phase",
                    prev.direction, entry.direction, entry.transition,
                ),
                trace_index: i + 1,
            });
        }
    }
}

fn check_round_robin(trace: &[TraceEntry], rule_name: &str, violations: &mut Vec<TemporalViolation>) {
    for (i, pair) in trace.windows(2).enumerate() {
        let (prev, entry) = (&pair[0], &pair[1]);
        if entry.transition != Transition::YellowExpired || entry.mode != ControlMode::Automatic {
            continue;
        }
        let expected = prev.direction.following();
        if entry.direction != expected {
            violations.push(TemporalViolation {
                rule_name: rule_name.to_string(),
                message: format!(
                    "Automatic advance from {} went to {}, expected {}",
                    prev.direction, entry.direction, expected,
                ),
                trace_index: i + 1,
            });
        }
    }
}
