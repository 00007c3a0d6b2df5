use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Road parameters shared read-only by every update computation of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadParams {
    /// Number of cells on the closed loop (L).
    pub road_length: u32,
    /// Global speed cap in cells per step (v_max).
    pub max_speed: u32,
    /// Probability that a moving vehicle slows down by one in a step (p).
    pub slowdown_probability: f64,
}

impl RoadParams {
    /// Builds a validated parameter set.
    pub fn new(road_length: u32, max_speed: u32, slowdown_probability: f64) -> Result<Self, SimError> {
        let params = Self { road_length, max_speed, slowdown_probability };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.road_length == 0 {
            return Err(SimError::invalid_config("road length must be greater than 0"));
        }
        if self.max_speed < 1 {
            return Err(SimError::invalid_config("max speed must be at least 1"));
        }
        // Written so that NaN is rejected as well.
        if !(0.0..=1.0).contains(&self.slowdown_probability) {
            return Err(SimError::invalid_config(format!(
                "slowdown probability must be within [0, 1], got {}",
                self.slowdown_probability
            )));
        }
        Ok(())
    }

    /// Fraction of cells occupied by `vehicle_count` vehicles.
    pub fn density(&self, vehicle_count: usize) -> f64 {
        vehicle_count as f64 / self.road_length as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_params() {
        let params = RoadParams::new(250, 5, 0.3).unwrap();
        assert_eq!(params.road_length, 250);
        assert_eq!(params.density(25), 0.1);
    }

    #[test]
    fn test_rejects_bad_params() {
        assert!(matches!(RoadParams::new(0, 5, 0.3), Err(SimError::InvalidConfiguration(_))));
        assert!(matches!(RoadParams::new(10, 0, 0.3), Err(SimError::InvalidConfiguration(_))));
        assert!(matches!(RoadParams::new(10, 2, 1.5), Err(SimError::InvalidConfiguration(_))));
        assert!(matches!(RoadParams::new(10, 2, -0.1), Err(SimError::InvalidConfiguration(_))));
        assert!(matches!(RoadParams::new(10, 2, f64::NAN), Err(SimError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_probability_bounds_are_inclusive() {
        assert!(RoadParams::new(10, 2, 0.0).is_ok());
        assert!(RoadParams::new(10, 2, 1.0).is_ok());
    }
}
