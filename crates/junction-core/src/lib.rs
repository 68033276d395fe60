//! Junction controller: session, collaborators and async host.

pub mod config;
pub mod console;
pub mod incidents;
mod persist;
pub mod readout;
pub mod relay;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod stats;
