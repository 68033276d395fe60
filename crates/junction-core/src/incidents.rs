//! Incident stream contract and direction classification.

use serde::{Deserialize, Serialize};

use junction_ir::types::{Direction, GeoPoint, IncidentKind};

/// A change in the set of reported incidents near the junction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IncidentEvent {
    Added {
        direction: Direction,
        kind: IncidentKind,
    },
    Removed {
        direction: Direction,
        kind: IncidentKind,
    },
    /// Full recount, e.g. after reloading every incident from the store.
    Resync { counts: [u32; 4] },
}

/// Centre of the deployed junction.
pub const DEFAULT_JUNCTION_CENTER: GeoPoint = GeoPoint {
    lat: 10.997576,
    lng: 75.992382,
};

/// Maps a coordinate to the approach it lies on.
pub trait DirectionClassifier: Send + Sync {
    fn classify(&self, location: GeoPoint) -> Direction;
}

/// Buckets a point by its bearing from the junction centre, in 90° sectors
/// centred on the compass axes.
#[derive(Debug, Clone, Copy)]
pub struct AngleBucketClassifier {
    pub center: GeoPoint,
}

impl AngleBucketClassifier {
    pub fn new(center: GeoPoint) -> Self {
        Self { center }
    }
}

impl Default for AngleBucketClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_JUNCTION_CENTER)
    }
}

impl DirectionClassifier for AngleBucketClassifier {
    fn classify(&self, location: GeoPoint) -> Direction {
        let angle = (location.lat - self.center.lat)
            .atan2(location.lng - self.center.lng)
            .to_degrees();
        if (-45.0..45.0).contains(&angle) {
            Direction::East
        } else if (45.0..135.0).contains(&angle) {
            Direction::North
        } else if (-135.0..-45.0).contains(&angle) {
            Direction::South
        } else {
            Direction::West
        }
    }
}

/// Open incident counts per direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncidentLedger {
    counts: [u32; 4],
}

impl IncidentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, direction: Direction) -> u32 {
        self.counts[direction.index()]
    }

    /// Record a new incident; returns the direction's new count.
    pub fn add(&mut self, direction: Direction) -> u32 {
        let count = &mut self.counts[direction.index()];
        *count = count.saturating_add(1);
        *count
    }

    /// Forget one incident; never goes below zero.
    pub fn remove(&mut self, direction: Direction) -> u32 {
        let count = &mut self.counts[direction.index()];
        *count = count.saturating_sub(1);
        *count
    }

    pub fn replace(&mut self, counts: [u32; 4]) {
        self.counts = counts;
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> AngleBucketClassifier {
        AngleBucketClassifier::new(GeoPoint::new(10.0, 76.0))
    }

    #[test]
    fn test_angle_buckets() {
        let c = classifier();
        assert_eq!(c.classify(GeoPoint::new(10.0, 76.1)), Direction::East);
        assert_eq!(c.classify(GeoPoint::new(10.1, 76.0)), Direction::North);
        assert_eq!(c.classify(GeoPoint::new(9.9, 76.0)), Direction::South);
        assert_eq!(c.classify(GeoPoint::new(10.0, 75.9)), Direction::West);
    }

    #[test]
    fn test_sector_boundaries() {
        let c = classifier();
        // Lower bounds are inclusive: 45° is north, -45° is east.
        assert_eq!(c.classify(GeoPoint::new(10.5, 76.5)), Direction::North);
        assert_eq!(c.classify(GeoPoint::new(9.5, 76.5)), Direction::East);
        // 180° falls through to west.
        assert_eq!(c.classify(GeoPoint::new(10.0, 75.0)), Direction::West);
    }

    #[test]
    fn test_ledger_saturates_at_zero() {
        let mut ledger = IncidentLedger::new();
        assert_eq!(ledger.remove(Direction::North), 0);
        assert_eq!(ledger.add(Direction::North), 1);
        assert_eq!(ledger.add(Direction::North), 2);
        assert_eq!(ledger.remove(Direction::North), 1);
        assert_eq!(ledger.total(), 1);
    }
}
