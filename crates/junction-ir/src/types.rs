use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parse::ParseError;

// ── Section 1: Directions ────────────────────────────────────────────

/// One of the four approaches to the junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Fixed round-robin order. Wraps from `West` back to `North`.
    pub const SEQUENCE: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Position of this direction in [`Direction::SEQUENCE`].
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Direction at `index`, wrapping modulo the sequence length.
    pub fn from_index(index: usize) -> Self {
        Self::SEQUENCE[index % Self::SEQUENCE.len()]
    }

    /// The direction after this one in the fixed sequence.
    pub fn following(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }

    /// Capitalised name for operator read-outs.
    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" => Ok(Direction::North),
            "east" => Ok(Direction::East),
            "south" => Ok(Direction::South),
            "west" => Ok(Direction::West),
            _ => Err(ParseError::UnknownDirection(s.to_string())),
        }
    }
}

// ── Section 2: Signal phases ─────────────────────────────────────────

/// Indicator state of a single direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPhase {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for SignalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalPhase::Green => "GREEN",
            SignalPhase::Yellow => "YELLOW",
            SignalPhase::Red => "RED",
        })
    }
}

/// Time left in the active phase.
///
/// Emergency mode holds its direction green with no deadline, which is
/// modelled as `Unbounded` rather than a sentinel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remaining {
    Seconds(u32),
    Unbounded,
}

impl Remaining {
    pub fn seconds(self) -> Option<u32> {
        match self {
            Remaining::Seconds(s) => Some(s),
            Remaining::Unbounded => None,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Remaining::Unbounded)
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::Seconds(s) => write!(f, "{s}"),
            Remaining::Unbounded => f.write_str("∞"),
        }
    }
}

// ── Section 3: Timing configuration ──────────────────────────────────

pub const BASE_TIME_RANGE: RangeInclusive<u32> = 10..=60;
pub const CONGESTION_WEIGHT_RANGE: RangeInclusive<u32> = 1..=10;
pub const YELLOW_TIME_RANGE: RangeInclusive<u32> = 1..=10;

/// Operator-settable signal timing.
///
/// Serialized with the field names of the stored settings record
/// (`baseTime`, `congestionWeight`, `yellowTime`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(rename = "baseTime")]
    pub base_time_secs: u32,
    #[serde(rename = "congestionWeight")]
    pub congestion_weight: u32,
    #[serde(rename = "yellowTime")]
    pub yellow_time_secs: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_time_secs: 20,
            congestion_weight: 5,
            yellow_time_secs: 3,
        }
    }
}

impl TimingConfig {
    /// True when every field lies inside its permitted range.
    pub fn is_within_bounds(&self) -> bool {
        BASE_TIME_RANGE.contains(&self.base_time_secs)
            && CONGESTION_WEIGHT_RANGE.contains(&self.congestion_weight)
            && YELLOW_TIME_RANGE.contains(&self.yellow_time_secs)
    }

    /// Clamp every field into range, reporting what had to change.
    pub fn clamped(self) -> (TimingConfig, Vec<ConfigAdjustment>) {
        RawTimingConfig {
            base_time: Some(self.base_time_secs as i64),
            congestion_weight: Some(self.congestion_weight as i64),
            yellow_time: Some(self.yellow_time_secs as i64),
        }
        .resolve()
    }
}

/// A field that was out of range and got clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigAdjustment {
    pub field: &'static str,
    pub requested: i64,
    pub applied: u32,
}

/// Timing values as an operator or a stored record supplies them.
///
/// Missing or zero values fall back to the defaults, then everything is
/// clamped into range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimingConfig {
    #[serde(rename = "baseTime", default)]
    pub base_time: Option<i64>,
    #[serde(rename = "congestionWeight", default)]
    pub congestion_weight: Option<i64>,
    #[serde(rename = "yellowTime", default)]
    pub yellow_time: Option<i64>,
}

impl RawTimingConfig {
    pub fn resolve(&self) -> (TimingConfig, Vec<ConfigAdjustment>) {
        let defaults = TimingConfig::default();
        let mut adjustments = Vec::new();

        let base_time_secs = resolve_field(
            "baseTime",
            self.base_time,
            defaults.base_time_secs,
            &BASE_TIME_RANGE,
            &mut adjustments,
        );
        let congestion_weight = resolve_field(
            "congestionWeight",
            self.congestion_weight,
            defaults.congestion_weight,
            &CONGESTION_WEIGHT_RANGE,
            &mut adjustments,
        );
        let yellow_time_secs = resolve_field(
            "yellowTime",
            self.yellow_time,
            defaults.yellow_time_secs,
            &YELLOW_TIME_RANGE,
            &mut adjustments,
        );

        (
            TimingConfig {
                base_time_secs,
                congestion_weight,
                yellow_time_secs,
            },
            adjustments,
        )
    }
}

fn resolve_field(
    field: &'static str,
    value: Option<i64>,
    default: u32,
    range: &RangeInclusive<u32>,
    adjustments: &mut Vec<ConfigAdjustment>,
) -> u32 {
    let requested = match value {
        Some(0) | None => return default,
        Some(v) => v,
    };
    let applied = requested.clamp(*range.start() as i64, *range.end() as i64) as u32;
    if applied as i64 != requested {
        adjustments.push(ConfigAdjustment {
            field,
            requested,
            applied,
        });
    }
    applied
}

// ── Section 4: Congestion ────────────────────────────────────────────

pub const MAX_CONGESTION_LEVEL: u8 = 10;

/// Coarse congestion bucket shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionBand {
    Low,
    Medium,
    High,
}

impl CongestionBand {
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=3 => CongestionBand::Low,
            4..=6 => CongestionBand::Medium,
            _ => CongestionBand::High,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CongestionBand::Low => "Low",
            CongestionBand::Medium => "Medium",
            CongestionBand::High => "High",
        }
    }
}

// ── Section 5: Incidents ─────────────────────────────────────────────

/// Kind of citizen report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Pothole,
    Accident,
    Ambulance,
}

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}
