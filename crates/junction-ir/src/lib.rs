//! Data model shared by the signal engine and its collaborators.

pub mod parse;
pub mod types;
