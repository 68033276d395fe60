//! Deterministic traffic-signal state machines.

pub mod congestion;
pub mod coordinator;
pub mod engine;
pub mod invariant;
pub mod simulate;
pub mod state;
pub mod temporal;
