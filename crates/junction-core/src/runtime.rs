//! Async host for a [`JunctionSession`].
//!
//! The session lives inside a single task. Operator commands, incident
//! events, the startup relay poll and the countdown tick are all delivered
//! to that task, so every handler runs to completion before the next one
//! starts and no state is shared between threads.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use junction_ir::types::{Direction, RawTimingConfig};
use junction_model::coordinator::OverrideOutcome;
use junction_model::state::{ArmedTimer, EngineState, TimerToken};

use crate::config::ControllerConfig;
use crate::console;
use crate::incidents::IncidentEvent;
use crate::readout::SignalReadout;
use crate::relay::OverrideMailbox;
use crate::session::{ConfigApplied, JunctionSession};
use crate::stats::SignalStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("controller task has exited")]
    Closed,
}

/// Point-in-time copy of the controller's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub state: EngineState,
    pub armed: Option<ArmedTimer>,
    pub readout: SignalReadout,
    pub stats: SignalStats,
}

enum Command {
    Override {
        direction: Direction,
        reply: oneshot::Sender<OverrideOutcome>,
    },
    ToggleEmergency {
        reply: oneshot::Sender<bool>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    ApplyConfig {
        raw: RawTimingConfig,
        reply: oneshot::Sender<ConfigApplied>,
    },
    SetCongestion {
        direction: Direction,
        level: i64,
        reply: oneshot::Sender<u8>,
    },
    Snapshot {
        reply: oneshot::Sender<ControllerSnapshot>,
    },
    Console {
        request: Value,
        reply: oneshot::Sender<Value>,
    },
    Shutdown,
}

/// Cloneable handle to a running controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Command>,
}

impl ControllerHandle {
    async fn call<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    pub async fn request_override(
        &self,
        direction: Direction,
    ) -> Result<OverrideOutcome, ControllerError> {
        self.call(|reply| Command::Override { direction, reply }).await
    }

    pub async fn toggle_emergency(&self) -> Result<bool, ControllerError> {
        self.call(|reply| Command::ToggleEmergency { reply }).await
    }

    pub async fn reset(&self) -> Result<(), ControllerError> {
        self.call(|reply| Command::Reset { reply }).await
    }

    pub async fn apply_config(
        &self,
        raw: RawTimingConfig,
    ) -> Result<ConfigApplied, ControllerError> {
        self.call(|reply| Command::ApplyConfig { raw, reply }).await
    }

    pub async fn set_congestion(
        &self,
        direction: Direction,
        level: i64,
    ) -> Result<u8, ControllerError> {
        self.call(|reply| Command::SetCongestion {
            direction,
            level,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<ControllerSnapshot, ControllerError> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    /// Run one JSON-RPC console request against the session.
    pub async fn console(&self, request: Value) -> Result<Value, ControllerError> {
        self.call(|reply| Command::Console { request, reply }).await
    }

    /// Ask the task to stop. The session comes back through the join handle.
    pub async fn shutdown(&self) -> Result<(), ControllerError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| ControllerError::Closed)
    }
}

/// Start `session` on its own task.
///
/// The session is started immediately. `mailbox`, if given, is polled once
/// after the configured relay delay. The task ends on
/// [`ControllerHandle::shutdown`] or when every handle is dropped.
pub fn spawn_controller(
    session: JunctionSession,
    config: &ControllerConfig,
    mailbox: Option<Box<dyn OverrideMailbox>>,
    incidents: mpsc::Receiver<IncidentEvent>,
) -> (ControllerHandle, JoinHandle<JunctionSession>) {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
    let task = tokio::spawn(run(
        session,
        config.tick_interval(),
        config.relay_delay(),
        mailbox,
        rx,
        incidents,
    ));
    (ControllerHandle { tx }, task)
}

async fn run(
    mut session: JunctionSession,
    tick: Duration,
    relay_delay: Duration,
    mut mailbox: Option<Box<dyn OverrideMailbox>>,
    mut commands: mpsc::Receiver<Command>,
    mut incidents: mpsc::Receiver<IncidentEvent>,
) -> JunctionSession {
    session.start();
    let relay_at = Instant::now() + relay_delay;
    let mut incidents_open = true;
    let mut schedule: Option<(TimerToken, Instant)> = None;

    tracing::info!(?tick, ?relay_delay, "controller started");

    loop {
        // Keep the cadence while the same timer stays armed, restart it
        // from now whenever a handler armed a new one.
        schedule = match (session.armed_timer(), schedule) {
            (Some(armed), Some((token, deadline))) if armed.token == token => {
                Some((token, deadline))
            }
            (Some(armed), _) => Some((armed.token, Instant::now() + tick)),
            (None, _) => None,
        };
        let tick_at = schedule.map(|(_, deadline)| deadline);

        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => handle_command(&mut session, command),
            },

            event = incidents.recv(), if incidents_open => match event {
                Some(event) => session.handle_incident(&event),
                None => {
                    tracing::debug!("incident stream closed");
                    incidents_open = false;
                }
            },

            _ = sleep_until(relay_at), if mailbox.is_some() => {
                if let Some(mailbox) = mailbox.take() {
                    session.apply_pending_override(mailbox.as_ref());
                }
            },

            _ = sleep_until(tick_at.unwrap_or_else(Instant::now)), if tick_at.is_some() => {
                if let Some((token, deadline)) = schedule {
                    session.on_timer(token);
                    schedule = Some((token, deadline + tick));
                }
            },
        }
    }

    tracing::info!(
        direction = %session.state().current_direction,
        "controller stopped"
    );
    session
}

fn handle_command(session: &mut JunctionSession, command: Command) {
    // A dropped reply receiver just means the caller stopped waiting.
    match command {
        Command::Override { direction, reply } => {
            let _ = reply.send(session.request_manual_override(direction));
        }
        Command::ToggleEmergency { reply } => {
            let _ = reply.send(session.toggle_emergency_mode());
        }
        Command::Reset { reply } => {
            session.reset_to_automatic();
            let _ = reply.send(());
        }
        Command::ApplyConfig { raw, reply } => {
            let _ = reply.send(session.apply_config(&raw));
        }
        Command::SetCongestion {
            direction,
            level,
            reply,
        } => {
            let _ = reply.send(session.set_congestion(direction, level));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(snapshot(session));
        }
        Command::Console { request, reply } => {
            let _ = reply.send(console::handle_request(&request, session));
        }
        Command::Shutdown => {}
    }
}

fn snapshot(session: &JunctionSession) -> ControllerSnapshot {
    ControllerSnapshot {
        state: session.state().clone(),
        armed: session.armed_timer(),
        readout: session.readout(),
        stats: session.stats().clone(),
    }
}
