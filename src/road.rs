use traffic_common::{RoadParams, SimError, Snapshot, Vehicle};

/// One consistent instant of the closed-loop road.
///
/// Vehicles are kept sorted by position. A state is never edited in place once
/// built: the update rule reads a frozen `RoadState` and produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadState {
    params: RoadParams,
    vehicles: Vec<Vehicle>,
}

impl RoadState {
    /// Creates a state from vehicles in any order, sorting them by position.
    /// The result is not validated; call [`RoadState::validate`] before use.
    pub fn new(params: RoadParams, mut vehicles: Vec<Vehicle>) -> Self {
        vehicles.sort_by_key(|v| v.position);
        Self { params, vehicles }
    }

    /// Creates a state from vehicles already in road order, keeping that order.
    pub(crate) fn from_sorted(params: RoadParams, vehicles: Vec<Vehicle>) -> Self {
        Self { params, vehicles }
    }

    pub fn params(&self) -> &RoadParams {
        &self.params
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn density(&self) -> f64 {
        self.params.density(self.vehicles.len())
    }

    /// Number of empty cells between vehicle `index` (in road order) and the
    /// next vehicle ahead, wrapping around the loop. A lone vehicle sees the
    /// whole road minus its own cell.
    ///
    /// Panics if `index` is out of range.
    pub fn gap_ahead(&self, index: usize) -> u32 {
        let len = self.params.road_length;
        if self.vehicles.len() == 1 {
            return len - 1;
        }
        let here = self.vehicles[index].position as u64;
        let ahead = self.vehicles[(index + 1) % self.vehicles.len()].position as u64;
        let len = len as u64;
        ((ahead + len - here - 1) % len) as u32
    }

    /// Checks ordering, uniqueness and bounds of every vehicle.
    pub fn validate(&self) -> Result<(), SimError> {
        let len = self.params.road_length;
        let v_max = self.params.max_speed;

        if self.vehicles.len() > len as usize {
            return Err(SimError::invariant(format!(
                "{} vehicles do not fit on a road of {} cells",
                self.vehicles.len(),
                len
            )));
        }
        for v in &self.vehicles {
            if v.position >= len {
                return Err(SimError::invariant(format!(
                    "vehicle {} at cell {} is off a road of {} cells",
                    v.id, v.position, len
                )));
            }
            if v.speed > v_max {
                return Err(SimError::invariant(format!(
                    "vehicle {} has speed {} above the cap of {}",
                    v.id, v.speed, v_max
                )));
            }
        }
        for pair in self.vehicles.windows(2) {
            if pair[0].position == pair[1].position {
                return Err(SimError::invariant(format!(
                    "vehicles {} and {} share cell {}",
                    pair[0].id, pair[1].id, pair[0].position
                )));
            }
            if pair[0].position > pair[1].position {
                return Err(SimError::invariant(format!(
                    "vehicle {} at cell {} is listed before vehicle {} at cell {}",
                    pair[0].id, pair[0].position, pair[1].id, pair[1].position
                )));
            }
        }
        Ok(())
    }

    /// Freezes the current vehicles into a snapshot tagged with `step`.
    pub fn snapshot(&self, step: u32) -> Snapshot {
        Snapshot { step, vehicles: self.vehicles.clone() }
    }
}
