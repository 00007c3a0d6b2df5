pub mod config;
pub mod error;
pub mod metrics;
pub mod record;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, RoadConfig, VehicleConfig, DynamicsConfig, RunConfig, MetricsConfig, OutputConfig, OutputFormat, PlacementPolicy, InitialSpeed};
pub use error::SimError;
pub use metrics::{StepMetrics, RunMetrics, MetricsReport};
pub use record::RunRecord;
pub use sim_params::RoadParams;
pub use snapshot::{Snapshot, Vehicle};
