use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use crate::error::SimError;
use crate::sim_params::RoadParams;
use std::path::Path;

// Road geometry
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RoadConfig {
    pub length: i64,
}

/// How vehicles are spread over the road before step 0.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Distinct cells drawn at random.
    #[default]
    UniformRandom,
    /// One vehicle every `L / count` cells, starting at cell 0.
    EvenlySpaced,
}

/// Speeds assigned to vehicles before step 0.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitialSpeed {
    #[default]
    Zero,
    /// Uniform in `[0, max_speed)`.
    Random,
}

// Vehicle population and speed cap
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct VehicleConfig {
    pub count: i64,
    pub max_speed: i64,
    #[serde(default)]
    pub placement: PlacementPolicy,
    #[serde(default)]
    pub initial_speed: InitialSpeed,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DynamicsConfig {
    pub slowdown_probability: f64,
}

// Run length and reproducibility
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    pub steps: i64,
    /// Omit to draw a fresh seed; the seed actually used is reported with the results.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Settings for the metrics aggregation, loaded from the `[metrics]` section.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Leading steps excluded from run-level averages.
    #[serde(default)]
    pub warmup_steps: u32,
    /// Vehicles at or below this speed count as jammed.
    #[serde(default)]
    pub jam_speed_threshold: u32,
    /// Share of the road, at its end, where throughput is counted.
    #[serde(default = "default_measurement_fraction")]
    pub measurement_fraction: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            warmup_steps: 0,
            jam_speed_threshold: 0,
            measurement_fraction: default_measurement_fraction(),
        }
    }
}

fn default_measurement_fraction() -> f64 {
    0.1 // Rightmost 10% of the road
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Bincode,
    MessagePack,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }

    /// Picks the format that wrote a file with the given extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "bin" | "bincode" => Some(OutputFormat::Bincode),
            "msgpack" | "messagepack" => Some(OutputFormat::MessagePack),
            _ => None,
        }
    }
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_true")]
    pub save_snapshots: bool,
    #[serde(default = "default_true")]
    pub save_metrics_csv: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "traffic".to_string(),
            format: OutputFormat::Json,
            save_snapshots: true,
            save_metrics_csv: true,
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub road: RoadConfig,
    pub vehicles: VehicleConfig,
    pub dynamics: DynamicsConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file without validating
    /// it, so command-line overrides can be applied first. Call
    /// [`SimulationConfig::validate`] before running.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
        Self::parse(&config_str).with_context(|| format!("Failed to load config from '{}'", path_ref.display()))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config = Self::parse(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).context("Failed to parse TOML")
    }

    /// Checks every parameter that a run depends on.
    pub fn validate(&self) -> Result<(), SimError> {
        let params = self.road_params()?;
        let count = self.vehicle_count()?;
        if count > params.road_length {
            return Err(SimError::invalid_config(format!(
                "vehicle count {} exceeds road length {}",
                count, params.road_length
            )));
        }
        let steps = self.steps()?;
        let warmup = self.metrics.warmup_steps;
        if warmup > 0 && warmup >= steps {
            return Err(SimError::invalid_config(format!(
                "warm-up of {warmup} steps leaves nothing to average over {steps} steps"
            )));
        }
        let fraction = self.metrics.measurement_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(SimError::invalid_config(format!(
                "measurement fraction must be within (0, 1], got {fraction}"
            )));
        }
        Ok(())
    }

    /// Converts the configuration into the road parameters used at runtime.
    pub fn road_params(&self) -> Result<RoadParams, SimError> {
        let road_length = positive_u32("road length", self.road.length)?;
        let max_speed = positive_u32("max speed", self.vehicles.max_speed)?;
        RoadParams::new(road_length, max_speed, self.dynamics.slowdown_probability)
    }

    pub fn vehicle_count(&self) -> Result<u32, SimError> {
        positive_u32("vehicle count", self.vehicles.count)
    }

    pub fn steps(&self) -> Result<u32, SimError> {
        u32::try_from(self.run.steps).map_err(|_| {
            SimError::invalid_config(format!(
                "step count must be within [0, {}], got {}",
                u32::MAX,
                self.run.steps
            ))
        })
    }
}

fn positive_u32(name: &str, value: i64) -> Result<u32, SimError> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(SimError::invalid_config(format!(
            "{name} must be within [1, {}], got {value}",
            u32::MAX
        ))),
    }
}
