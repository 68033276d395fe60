use junction_ir::types::{CongestionBand, Direction, MAX_CONGESTION_LEVEL};

/// Congestion every direction starts with, and the floor for incident-derived levels.
pub const BASELINE_LEVEL: u8 = 2;

/// Per-direction demand proxy in `0..=10`.
///
/// Read by the timing engine, written only through [`CongestionModel::set_level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionModel {
    levels: [u8; 4],
}

impl CongestionModel {
    pub fn new() -> Self {
        Self {
            levels: [BASELINE_LEVEL; 4],
        }
    }

    /// Store a level for `direction`, clamped into `0..=10`. Returns the stored value.
    pub fn set_level(&mut self, direction: Direction, level: i64) -> u8 {
        let clamped = level.clamp(0, MAX_CONGESTION_LEVEL as i64) as u8;
        self.levels[direction.index()] = clamped;
        clamped
    }

    pub fn level(&self, direction: Direction) -> u8 {
        self.levels[direction.index()]
    }

    pub fn band(&self, direction: Direction) -> CongestionBand {
        CongestionBand::from_level(self.level(direction))
    }

    /// Level implied by an incident count: `min(count / 2 + 2, 10)`.
    pub fn level_for_incident_count(incident_count: u32) -> u8 {
        (incident_count / 2 + BASELINE_LEVEL as u32).min(MAX_CONGESTION_LEVEL as u32) as u8
    }

    /// Derive the level for `direction` from its incident count and store it.
    pub fn apply_incident_count(&mut self, direction: Direction, incident_count: u32) -> u8 {
        let level = Self::level_for_incident_count(incident_count);
        self.set_level(direction, level as i64)
    }

    /// All levels in sequence order.
    pub fn levels(&self) -> [(Direction, u8); 4] {
        Direction::SEQUENCE.map(|d| (d, self.level(d)))
    }
}

impl Default for CongestionModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_step_function() {
        assert_eq!(CongestionModel::level_for_incident_count(0), 2);
        assert_eq!(CongestionModel::level_for_incident_count(1), 2);
        assert_eq!(CongestionModel::level_for_incident_count(2), 3);
        assert_eq!(CongestionModel::level_for_incident_count(9), 6);
        assert_eq!(CongestionModel::level_for_incident_count(16), 10);
        assert_eq!(CongestionModel::level_for_incident_count(1000), 10);
    }

    #[test]
    fn test_incident_levels_are_monotone() {
        let mut previous = 0;
        for count in 0..40 {
            let level = CongestionModel::level_for_incident_count(count);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_set_level_clamps() {
        let mut model = CongestionModel::new();
        assert_eq!(model.set_level(Direction::East, 14), 10);
        assert_eq!(model.set_level(Direction::West, -2), 0);
        assert_eq!(model.level(Direction::East), 10);
        assert_eq!(model.level(Direction::West), 0);
        assert_eq!(model.level(Direction::North), BASELINE_LEVEL);
    }
}
