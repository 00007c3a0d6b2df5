use serde::{Deserialize, Serialize};

/// Metrics derived from a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub step: u32,
    pub vehicle_count: u32,
    /// Occupied fraction of the road (vehicles per cell).
    pub density: f64,
    /// Arithmetic mean of vehicle speeds, in cells per step.
    pub mean_speed: f64,
    /// Mean speed as a fraction of the speed cap.
    pub relative_speed: f64,
    /// `mean_speed * density`, vehicles per step.
    pub flow: f64,
    /// Vehicles at or below the jam speed threshold.
    pub stopped_count: u32,
    pub jam_fraction: f64,
    /// Number of separate queues of stopped vehicles standing bumper to bumper.
    pub jam_clusters: u32,
    /// Vehicles inside the measurement stretch at the end of the road.
    pub throughput: u32,
    /// Vehicles that passed the wrap boundary (cell L-1 to cell 0) during this step.
    pub crossings: u32,
}

/// Time averages over every step after the warm-up prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub warmup_steps: u32,
    pub averaged_steps: u32,
    pub mean_density: f64,
    pub mean_flow: f64,
    pub mean_speed: f64,
    pub mean_relative_speed: f64,
    pub mean_jam_fraction: f64,
    pub mean_throughput: f64,
    pub total_crossings: u64,
    /// Boundary crossings per averaged step, the directly measured flow.
    pub measured_flow: f64,
}

/// Per-step series plus run-level aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub steps: Vec<StepMetrics>,
    pub summary: RunMetrics,
}
