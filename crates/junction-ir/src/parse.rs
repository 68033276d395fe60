use crate::types::{ConfigAdjustment, Direction, RawTimingConfig, TimingConfig};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown direction: '{0}'")]
    UnknownDirection(String),
}

/// Parse a stored settings record, filling gaps with defaults and
/// clamping out-of-range values.
pub fn parse_timing_config(json: &str) -> Result<(TimingConfig, Vec<ConfigAdjustment>), ParseError> {
    let raw: RawTimingConfig = serde_json::from_str(json)?;
    Ok(raw.resolve())
}

pub fn parse_direction(s: &str) -> Result<Direction, ParseError> {
    s.parse()
}
