use serde::Serialize;

use junction_ir::types::{
    ConfigAdjustment, Direction, GeoPoint, IncidentKind, RawTimingConfig, TimingConfig,
};
use junction_model::congestion::CongestionModel;
use junction_model::coordinator::OverrideOutcome;
use junction_model::engine::SignalEngine;
use junction_model::invariant::check_invariants;
use junction_model::state::{ArmedTimer, EngineState, TimerToken, Transition};

use crate::incidents::{AngleBucketClassifier, DirectionClassifier, IncidentEvent, IncidentLedger};
use crate::readout::{build_readout, SignalReadout};
use crate::relay::OverrideMailbox;
use crate::settings::SettingsStore;
use crate::stats::SignalStats;

/// Result of applying operator timing settings.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigApplied {
    pub config: TimingConfig,
    /// Fields that were out of range and got clamped.
    pub adjustments: Vec<ConfigAdjustment>,
    /// False when the settings store rejected the save; the config is
    /// still in effect for this session.
    pub persisted: bool,
}

/// One admin session: the signal engine plus everything that feeds it.
///
/// The session is the sole owner of the engine state. Every method is a
/// handler that runs to completion; hosts that serve several callers must
/// funnel them through one task (see [`crate::runtime`]).
pub struct JunctionSession {
    engine: SignalEngine,
    congestion: CongestionModel,
    incidents: IncidentLedger,
    settings: Box<dyn SettingsStore>,
    classifier: Box<dyn DirectionClassifier>,
    stats: SignalStats,
}

impl JunctionSession {
    /// Create a session, loading the stored timing settings. A failing
    /// store leaves the defaults in place.
    pub fn new(settings: Box<dyn SettingsStore>) -> Self {
        let config = match settings.load() {
            Ok(Some(config)) => {
                tracing::info!(?config, "timing settings loaded");
                config
            }
            Ok(None) => TimingConfig::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load timing settings, using defaults");
                TimingConfig::default()
            }
        };
        Self {
            engine: SignalEngine::new(config),
            congestion: CongestionModel::new(),
            incidents: IncidentLedger::new(),
            settings,
            classifier: Box::new(AngleBucketClassifier::default()),
            stats: SignalStats::new(),
        }
    }

    /// Replace the classifier used for incident locations.
    pub fn with_classifier(mut self, classifier: Box<dyn DirectionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Begin automatic sequencing.
    pub fn start(&mut self) {
        self.engine.start(&self.congestion);
        self.record_current_green();
        self.audit("start");
    }

    pub fn state(&self) -> &EngineState {
        self.engine.state()
    }

    pub fn config(&self) -> TimingConfig {
        *self.engine.config()
    }

    pub fn congestion(&self) -> &CongestionModel {
        &self.congestion
    }

    pub fn incidents(&self) -> &IncidentLedger {
        &self.incidents
    }

    pub fn stats(&self) -> &SignalStats {
        &self.stats
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    pub fn armed_timer(&self) -> Option<ArmedTimer> {
        self.engine.armed_timer()
    }

    pub fn green_duration(&self, direction: Direction) -> u32 {
        self.engine.green_duration(direction, &self.congestion)
    }

    /// Deliver a countdown tick for `token`.
    pub fn on_timer(&mut self, token: TimerToken) -> Option<Transition> {
        let transition = self.engine.on_timer(token, &self.congestion);
        if transition == Some(Transition::YellowExpired) {
            self.record_current_green();
        }
        if transition.is_some() {
            self.audit("timer");
        }
        transition
    }

    pub fn request_manual_override(&mut self, direction: Direction) -> OverrideOutcome {
        let outcome = self.engine.request_manual_override(direction, &self.congestion);
        self.stats.record_override(outcome);
        if outcome == OverrideOutcome::SwitchedImmediately {
            self.record_current_green();
        }
        self.audit("override");
        outcome
    }

    /// Flip emergency mode; returns whether it is now active.
    pub fn toggle_emergency_mode(&mut self) -> bool {
        let active = self.engine.toggle_emergency_mode(&self.congestion);
        if active {
            self.stats.emergency_activations += 1;
            self.record_current_green();
        }
        self.audit("emergency");
        active
    }

    pub fn reset_to_automatic(&mut self) {
        self.engine.reset_to_automatic(&self.congestion);
        tracing::info!(direction = %self.state().current_direction, "reset to automatic");
        self.audit("reset");
    }

    /// Clamp, persist and apply new timing settings, then restart the
    /// automatic cycle so they take effect immediately.
    pub fn apply_config(&mut self, raw: &RawTimingConfig) -> ConfigApplied {
        let (config, adjustments) = raw.resolve();
        for adj in &adjustments {
            tracing::warn!(
                field = adj.field,
                requested = adj.requested,
                applied = adj.applied,
                "timing setting out of range, clamped"
            );
        }

        let persisted = match self.settings.save(&config) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist timing settings");
                false
            }
        };

        self.engine.set_config(config);
        tracing::info!(?config, persisted, "timing settings applied");
        self.reset_to_automatic();

        ConfigApplied {
            config,
            adjustments,
            persisted,
        }
    }

    /// Operator congestion input for `direction`. Returns the stored level.
    pub fn set_congestion(&mut self, direction: Direction, level: i64) -> u8 {
        let stored = self.congestion.set_level(direction, level);
        self.refresh_if_active(direction);
        stored
    }

    /// Apply an event from the incident stream.
    pub fn handle_incident(&mut self, event: &IncidentEvent) {
        match *event {
            IncidentEvent::Added { direction, kind } => {
                self.stats.incidents_ingested += 1;
                let count = self.incidents.add(direction);
                let level = self.congestion.apply_incident_count(direction, count);
                tracing::info!(
                    direction = %direction,
                    kind = ?kind,
                    count,
                    level,
                    "incident added"
                );
                self.refresh_if_active(direction);
            }
            IncidentEvent::Removed { direction, kind } => {
                let count = self.incidents.remove(direction);
                tracing::info!(direction = %direction, kind = ?kind, count, "incident removed");
                self.recompute_congestion();
            }
            IncidentEvent::Resync { counts } => {
                self.incidents.replace(counts);
                tracing::info!(?counts, "incident counts resynchronised");
                self.recompute_congestion();
            }
        }
        self.audit("incident");
    }

    /// Approach a reported location lies on.
    pub fn classify(&self, location: GeoPoint) -> Direction {
        self.classifier.classify(location)
    }

    /// Count a new incident reported at `location`. Returns the approach
    /// it was assigned to.
    pub fn report_incident_at(&mut self, kind: IncidentKind, location: GeoPoint) -> Direction {
        let direction = self.classify(location);
        self.handle_incident(&IncidentEvent::Added { direction, kind });
        direction
    }

    /// Take a request left by another context and apply it.
    pub fn apply_pending_override(&mut self, mailbox: &dyn OverrideMailbox) -> Option<OverrideOutcome> {
        match mailbox.take_pending_override() {
            Ok(Some(pending)) => {
                tracing::info!(
                    direction = %pending.direction,
                    requested_at_ms = pending.requested_at_ms,
                    "applying relayed override"
                );
                Some(self.request_manual_override(pending.direction))
            }
            Ok(None) => {
                tracing::debug!("no pending override");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read pending override");
                None
            }
        }
    }

    pub fn readout(&self) -> SignalReadout {
        build_readout(
            self.engine.state(),
            &self.congestion,
            &self.incidents,
            self.engine.config(),
        )
    }

    fn recompute_congestion(&mut self) {
        for direction in Direction::SEQUENCE {
            let count = self.incidents.count(direction);
            self.congestion.apply_incident_count(direction, count);
        }
    }

    /// Restart the active countdown when `direction` holds an automatic green.
    fn refresh_if_active(&mut self, direction: Direction) {
        if direction == self.state().current_direction && self.engine.restart_countdown(&self.congestion) {
            tracing::debug!(
                direction = %direction,
                seconds = %self.state().seconds_remaining,
                "countdown restarted with refreshed congestion"
            );
        }
    }

    fn record_current_green(&mut self) {
        let state = self.engine.state();
        self.stats
            .record_green(state.current_direction, state.seconds_remaining.seconds());
    }

    fn audit(&mut self, handler: &str) {
        let violations = check_invariants(self.engine.state(), self.engine.config());
        for v in &violations {
            tracing::error!(handler, rule = v.rule, "{}", v.message);
        }
        self.stats.invariant_violations += violations.len() as u32;
    }
}
