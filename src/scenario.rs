use crate::road::RoadState;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use traffic_common::{InitialSpeed, PlacementPolicy, RoadParams, SimError, SimulationConfig, Vehicle};

/// Builds the initial road state of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioBuilder {
    pub road_length: u32,
    pub vehicle_count: u32,
    pub max_speed: u32,
    pub slowdown_probability: f64,
    pub placement: PlacementPolicy,
    pub initial_speed: InitialSpeed,
}

impl ScenarioBuilder {
    pub fn new(road_length: u32, vehicle_count: u32, max_speed: u32, slowdown_probability: f64) -> Self {
        Self {
            road_length,
            vehicle_count,
            max_speed,
            slowdown_probability,
            placement: PlacementPolicy::default(),
            initial_speed: InitialSpeed::default(),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimError> {
        let params = config.road_params()?;
        let builder = Self::new(
            params.road_length,
            config.vehicle_count()?,
            params.max_speed,
            params.slowdown_probability,
        )
        .placement(config.vehicles.placement)
        .initial_speed(config.vehicles.initial_speed);
        Ok(builder)
    }

    pub fn placement(mut self, placement: PlacementPolicy) -> Self {
        self.placement = placement;
        self
    }

    pub fn initial_speed(mut self, initial_speed: InitialSpeed) -> Self {
        self.initial_speed = initial_speed;
        self
    }

    /// Places the vehicles with a generator seeded from `seed`. Ids follow the
    /// initial road order.
    pub fn build(&self, seed: u64) -> Result<RoadState, SimError> {
        self.build_with_rng(&mut StdRng::seed_from_u64(seed))
    }

    /// Places the vehicles drawing from `rng`, leaving the stream positioned
    /// for the dynamics that follow.
    pub fn build_with_rng(&self, rng: &mut StdRng) -> Result<RoadState, SimError> {
        let params = RoadParams::new(self.road_length, self.max_speed, self.slowdown_probability)?;
        if self.vehicle_count == 0 {
            return Err(SimError::invalid_config("vehicle count must be greater than 0"));
        }
        if self.vehicle_count > self.road_length {
            return Err(SimError::invalid_config(format!(
                "cannot place {} vehicles on {} cells without overlap",
                self.vehicle_count, self.road_length
            )));
        }
        if self.vehicle_count == self.road_length {
            warn!("Road of {} cells is fully occupied; every vehicle will stay at rest.", self.road_length);
        }

        let mut positions = place_vehicles(self.placement, self.road_length, self.vehicle_count, rng);
        positions.sort_unstable();

        let vehicles: Vec<Vehicle> = positions
            .into_iter()
            .enumerate()
            .map(|(id, position)| {
                let speed = match self.initial_speed {
                    InitialSpeed::Zero => 0,
                    InitialSpeed::Random => rng.random_range(0..self.max_speed),
                };
                Vehicle::new(id as u32, position, speed)
            })
            .collect();

        let state = RoadState::new(params, vehicles);
        state.validate()?;
        debug!(
            "Placed {} vehicles on {} cells ({:?}, density {:.3}).",
            state.vehicle_count(),
            self.road_length,
            self.placement,
            state.density()
        );
        Ok(state)
    }
}

/// Picks `count` distinct cells on a road of `road_length` cells.
fn place_vehicles(policy: PlacementPolicy, road_length: u32, count: u32, rng: &mut StdRng) -> Vec<u32> {
    match policy {
        PlacementPolicy::UniformRandom => {
            let mut cells: Vec<u32> = (0..road_length).collect();
            cells.shuffle(rng);
            cells.truncate(count as usize);
            cells
        }
        PlacementPolicy::EvenlySpaced => (0..count as u64)
            .map(|i| (i * road_length as u64 / count as u64) as u32)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn positions(state: &RoadState) -> Vec<u32> {
        state.vehicles().iter().map(|v| v.position).collect()
    }

    #[test]
    fn test_evenly_spaced_placement() {
        let state = ScenarioBuilder::new(10, 3, 2, 0.0)
            .placement(PlacementPolicy::EvenlySpaced)
            .build(0)
            .unwrap();
        assert_eq!(positions(&state), vec![0, 3, 6]);
        assert!(state.vehicles().iter().all(|v| v.speed == 0));
        let ids: Vec<u32> = state.vehicles().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_uniform_random_places_distinct_cells() {
        let state = ScenarioBuilder::new(50, 30, 5, 0.3).build(11).unwrap();
        let cells: HashSet<u32> = positions(&state).into_iter().collect();
        assert_eq!(cells.len(), 30);
        assert!(cells.iter().all(|&c| c < 50));
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_uniform_random_is_seeded() {
        let builder = ScenarioBuilder::new(100, 20, 5, 0.3).initial_speed(InitialSpeed::Random);
        assert_eq!(builder.build(5).unwrap(), builder.build(5).unwrap());
    }

    #[test]
    fn test_random_initial_speeds_stay_below_cap() {
        let state = ScenarioBuilder::new(200, 100, 4, 0.1)
            .initial_speed(InitialSpeed::Random)
            .build(3)
            .unwrap();
        assert!(state.vehicles().iter().all(|v| v.speed < 4));
    }

    #[test]
    fn test_full_road() {
        let state = ScenarioBuilder::new(8, 8, 3, 0.5).build(1).unwrap();
        assert_eq!(positions(&state), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_rejects_bad_counts() {
        let too_many = ScenarioBuilder::new(10, 11, 2, 0.0).build(0);
        assert!(matches!(too_many, Err(SimError::InvalidConfiguration(_))));

        let none = ScenarioBuilder::new(10, 0, 2, 0.0).build(0);
        assert!(matches!(none, Err(SimError::InvalidConfiguration(_))));

        let slow = ScenarioBuilder::new(10, 2, 0, 0.0).build(0);
        assert!(matches!(slow, Err(SimError::InvalidConfiguration(_))));

        let bad_p = ScenarioBuilder::new(10, 2, 2, 2.0).build(0);
        assert!(matches!(bad_p, Err(SimError::InvalidConfiguration(_))));
    }
}
