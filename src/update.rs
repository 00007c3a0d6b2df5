use crate::road::RoadState;
use log::trace;
use rand::distr::{Bernoulli, Distribution};
use rand::rngs::StdRng;
use traffic_common::{SimError, Vehicle};

/// A synchronous update applied to every vehicle of a road state.
///
/// Implementations read only the given state and return a new one; the
/// generator is the run's single random stream.
pub trait UpdateRule {
    fn next_state(&self, state: &RoadState, rng: &mut StdRng) -> Result<RoadState, SimError>;
}

/// The Nagel-Schreckenberg rule: accelerate, brake to the gap, randomly
/// slow down, then move.
#[derive(Debug, Clone, Copy, Default)]
pub struct NagelSchreckenberg;

impl NagelSchreckenberg {
    /// Computes every vehicle's speed for the coming step from the frozen
    /// `state`. Consumes exactly one random draw per vehicle, in road order.
    pub fn next_speeds(&self, state: &RoadState, rng: &mut StdRng) -> Result<Vec<u32>, SimError> {
        let params = state.params();
        let slowdown = Bernoulli::new(params.slowdown_probability).map_err(|e| {
            SimError::invalid_config(format!(
                "slowdown probability {}: {}",
                params.slowdown_probability, e
            ))
        })?;

        let speeds = state
            .vehicles()
            .iter()
            .enumerate()
            .map(|(idx, vehicle)| {
                // 1. Acceleration
                let mut speed = (vehicle.speed + 1).min(params.max_speed);
                // 2. Braking
                speed = speed.min(state.gap_ahead(idx));
                // 3. Randomization
                if slowdown.sample(rng) && speed > 0 {
                    speed -= 1;
                }
                speed
            })
            .collect();
        Ok(speeds)
    }

    /// Moves every vehicle by its new speed. Vehicles that pass the end of the
    /// road come out at the front of the new ordering.
    pub fn apply_moves(&self, state: &RoadState, speeds: &[u32]) -> Result<RoadState, SimError> {
        if speeds.len() != state.vehicle_count() {
            return Err(SimError::invariant(format!(
                "{} speeds computed for {} vehicles",
                speeds.len(),
                state.vehicle_count()
            )));
        }
        let len = state.params().road_length as u64;

        let mut wrapped = 0;
        let mut moved: Vec<Vehicle> = state
            .vehicles()
            .iter()
            .zip(speeds)
            .map(|(vehicle, &speed)| {
                let target = vehicle.position as u64 + speed as u64;
                if target >= len {
                    wrapped += 1;
                }
                Vehicle::new(vehicle.id, (target % len) as u32, speed)
            })
            .collect();
        moved.rotate_right(wrapped);

        Ok(RoadState::from_sorted(*state.params(), moved))
    }
}

impl UpdateRule for NagelSchreckenberg {
    fn next_state(&self, state: &RoadState, rng: &mut StdRng) -> Result<RoadState, SimError> {
        let speeds = self.next_speeds(state, rng)?;
        let next = self.apply_moves(state, &speeds)?;
        next.validate()?;
        trace!(
            "Moved {} vehicles, {} standing",
            next.vehicle_count(),
            speeds.iter().filter(|&&s| s == 0).count()
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use traffic_common::RoadParams;

    fn road(len: u32, v_max: u32, p: f64, vehicles: &[(u32, u32)]) -> RoadState {
        let params = RoadParams::new(len, v_max, p).unwrap();
        let vehicles = vehicles
            .iter()
            .enumerate()
            .map(|(i, &(pos, speed))| Vehicle::new(i as u32, pos, speed))
            .collect();
        RoadState::new(params, vehicles)
    }

    fn positions(state: &RoadState) -> Vec<u32> {
        state.vehicles().iter().map(|v| v.position).collect()
    }

    fn speeds(state: &RoadState) -> Vec<u32> {
        state.vehicles().iter().map(|v| v.speed).collect()
    }

    #[test]
    fn test_accelerates_from_rest_and_moves() {
        let state = road(10, 2, 0.0, &[(0, 0), (3, 0), (6, 0)]);
        let mut rng = StdRng::seed_from_u64(1);
        let next = NagelSchreckenberg.next_state(&state, &mut rng).unwrap();
        assert_eq!(positions(&next), vec![1, 4, 7]);
        assert_eq!(speeds(&next), vec![1, 1, 1]);
    }

    #[test]
    fn test_brakes_to_gap() {
        // Vehicle 0 would reach speed 3 but has only one free cell ahead.
        let state = road(20, 5, 0.0, &[(0, 2), (2, 0)]);
        let mut rng = StdRng::seed_from_u64(1);
        let next = NagelSchreckenberg.next_state(&state, &mut rng).unwrap();
        let v0 = next.vehicles().iter().find(|v| v.id == 0).unwrap();
        assert_eq!(v0.speed, 1);
        assert_eq!(v0.position, 1);
    }

    #[test]
    fn test_uses_gaps_from_before_the_step() {
        // Both vehicles are bumper to bumper at rest: the follower must not
        // move into the cell the leader is vacating.
        let state = road(10, 3, 0.0, &[(4, 0), (5, 0)]);
        let mut rng = StdRng::seed_from_u64(1);
        let next = NagelSchreckenberg.next_state(&state, &mut rng).unwrap();
        assert_eq!(positions(&next), vec![4, 6]);
        assert_eq!(speeds(&next), vec![0, 1]);
    }

    #[test]
    fn test_wrapping_vehicle_moves_to_front_of_order() {
        let state = road(10, 3, 0.0, &[(2, 0), (8, 2)]);
        let mut rng = StdRng::seed_from_u64(1);
        let next = NagelSchreckenberg.next_state(&state, &mut rng).unwrap();
        // Vehicle 1 travels 3 cells from 8 to 1 and is now first in road order.
        let ids: Vec<u32> = next.vehicles().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 0]);
        assert_eq!(positions(&next), vec![1, 3]);
    }

    #[test]
    fn test_certain_slowdown_reduces_every_moving_vehicle() {
        let state = road(30, 5, 1.0, &[(0, 3), (10, 0), (20, 5)]);
        let mut rng = StdRng::seed_from_u64(9);
        let next = NagelSchreckenberg.next_speeds(&state, &mut rng).unwrap();
        // accelerate to 4, 1, 5; no braking needed; then all drop by one.
        assert_eq!(next, vec![3, 0, 4]);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let state = road(100, 5, 0.5, &[(0, 0), (10, 3), (11, 1), (40, 5), (80, 2)]);
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let mut sa = state.clone();
        let mut sb = state;
        for _ in 0..50 {
            sa = NagelSchreckenberg.next_state(&sa, &mut a).unwrap();
            sb = NagelSchreckenberg.next_state(&sb, &mut b).unwrap();
        }
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_apply_moves_rejects_collision() {
        let state = road(10, 3, 0.0, &[(2, 0), (4, 0)]);
        let next = NagelSchreckenberg.apply_moves(&state, &[2, 0]).unwrap();
        assert!(matches!(next.validate(), Err(SimError::InvariantViolation(_))));
    }

    #[test]
    fn test_apply_moves_rejects_speed_count_mismatch() {
        let state = road(10, 3, 0.0, &[(2, 0), (4, 0)]);
        let result = NagelSchreckenberg.apply_moves(&state, &[1]);
        assert!(matches!(result, Err(SimError::InvariantViolation(_))));
    }
}
