//! Cellular-automaton traffic simulation on a single-lane closed loop.
//!
//! [`scenario::ScenarioBuilder`] places the vehicles, [`simulation::run`]
//! advances them with the [`update::NagelSchreckenberg`] rule and
//! [`metrics::MetricsAggregator`] summarizes the resulting snapshots.

pub mod metrics;
pub mod output;
pub mod road;
pub mod scenario;
pub mod simulation;
pub mod update;

pub use metrics::MetricsAggregator;
pub use road::RoadState;
pub use scenario::ScenarioBuilder;
pub use simulation::{resolve_seed, run, simulate, SimulationRunner};
pub use update::{NagelSchreckenberg, UpdateRule};
