use serde::{Deserialize, Serialize};

/// A single vehicle on the road.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vehicle {
    /// Stable identity, unchanged for the whole run.
    pub id: u32,
    /// Occupied cell, in `[0, road_length)`.
    pub position: u32,
    /// Cells travelled during the step that produced this state.
    pub speed: u32,
}

impl Vehicle {
    pub fn new(id: u32, position: u32, speed: u32) -> Self {
        Vehicle { id, position, speed }
    }
}

/// The road at a specific time step, frozen for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Index of the time step; the initial state is step 0.
    pub step: u32,
    /// Vehicles sorted by position.
    pub vehicles: Vec<Vehicle>,
}

impl Snapshot {
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Positions in road order, as the roadway diagram draws them.
    pub fn positions(&self) -> Vec<u32> {
        self.vehicles.iter().map(|v| v.position).collect()
    }

    pub fn speeds(&self) -> Vec<u32> {
        self.vehicles.iter().map(|v| v.speed).collect()
    }

    /// Per-cell occupancy: `Some(speed)` for an occupied cell, `None` for an empty one.
    pub fn cells(&self, road_length: u32) -> Vec<Option<u32>> {
        let mut cells = vec![None; road_length as usize];
        for v in &self.vehicles {
            if let Some(cell) = cells.get_mut(v.position as usize) {
                *cell = Some(v.speed);
            }
        }
        cells
    }
}
