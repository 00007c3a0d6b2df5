use log::debug;
use rayon::prelude::*;
use traffic_common::{MetricsConfig, MetricsReport, RoadParams, RunMetrics, SimError, Snapshot, StepMetrics};

/// Derives per-step and run-level metrics from a finished snapshot sequence.
///
/// Every metric is a pure function of the snapshots, so the per-step pass
/// runs in parallel over the immutable sequence.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    params: RoadParams,
    config: MetricsConfig,
}

impl MetricsAggregator {
    pub fn new(params: RoadParams, config: MetricsConfig) -> Result<Self, SimError> {
        params.validate()?;
        let fraction = config.measurement_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(SimError::invalid_config(format!(
                "measurement fraction must be within (0, 1], got {fraction}"
            )));
        }
        Ok(Self { params, config })
    }

    pub fn params(&self) -> &RoadParams {
        &self.params
    }

    /// First cell of the measurement stretch at the end of the road.
    pub fn measurement_start(&self) -> u32 {
        let len = self.params.road_length;
        let stretch = ((len as f64 * self.config.measurement_fraction).floor() as u32).clamp(1, len);
        len - stretch
    }

    /// Computes the metrics of one snapshot.
    pub fn step_metrics(&self, snapshot: &Snapshot) -> StepMetrics {
        let vehicles = &snapshot.vehicles;
        let count = vehicles.len();
        let density = self.params.density(count);

        let total_speed: u64 = vehicles.iter().map(|v| v.speed as u64).sum();
        let mean_speed = if count > 0 { total_speed as f64 / count as f64 } else { 0.0 };

        let threshold = self.config.jam_speed_threshold;
        let stopped_count = vehicles.iter().filter(|v| v.speed <= threshold).count();
        let jam_fraction = if count > 0 { stopped_count as f64 / count as f64 } else { 0.0 };

        let start = self.measurement_start();
        let throughput = vehicles.iter().filter(|v| v.position >= start).count();

        // A vehicle that ends up behind the distance it just travelled has wrapped.
        let crossings = if snapshot.step == 0 {
            0
        } else {
            vehicles.iter().filter(|v| v.position < v.speed).count()
        };

        StepMetrics {
            step: snapshot.step,
            vehicle_count: count as u32,
            density,
            mean_speed,
            relative_speed: mean_speed / self.params.max_speed as f64,
            flow: mean_speed * density,
            stopped_count: stopped_count as u32,
            jam_fraction,
            jam_clusters: self.jam_clusters(snapshot),
            throughput: throughput as u32,
            crossings: crossings as u32,
        }
    }

    /// Counts queues of stopped vehicles standing bumper to bumper. A stopped
    /// vehicle opens a new queue unless the vehicle directly behind it is
    /// stopped as well.
    fn jam_clusters(&self, snapshot: &Snapshot) -> u32 {
        let vehicles = &snapshot.vehicles;
        let n = vehicles.len();
        let len = self.params.road_length as u64;
        let threshold = self.config.jam_speed_threshold;
        let stopped = |i: usize| vehicles[i].speed <= threshold;

        let mut clusters = 0;
        let mut any_stopped = false;
        for i in 0..n {
            if !stopped(i) {
                continue;
            }
            any_stopped = true;
            let behind = (i + n - 1) % n;
            let gap = if n == 1 {
                len - 1
            } else {
                (vehicles[i].position as u64 + len - vehicles[behind].position as u64 - 1) % len
            };
            if !(stopped(behind) && gap == 0) {
                clusters += 1;
            }
        }
        // A queue wrapping the entire road has no first vehicle.
        if clusters == 0 && any_stopped {
            clusters = 1;
        }
        clusters
    }

    /// Computes the per-step series and its averages after the warm-up prefix.
    pub fn aggregate(&self, snapshots: &[Snapshot]) -> Result<MetricsReport, SimError> {
        if snapshots.is_empty() {
            return Err(SimError::invalid_config("no snapshots to aggregate"));
        }
        let num_steps = snapshots.len() - 1;
        let warmup = self.config.warmup_steps as usize;
        if warmup > 0 && warmup >= num_steps {
            return Err(SimError::invalid_config(format!(
                "warm-up of {warmup} steps leaves nothing to average over {num_steps} steps"
            )));
        }

        let steps: Vec<StepMetrics> = snapshots.par_iter().map(|s| self.step_metrics(s)).collect();
        let summary = summarize(&steps[warmup..], warmup as u32);
        debug!(
            "Aggregated {} steps (warm-up {}): density {:.3}, flow {:.3}, mean speed {:.3}",
            steps.len(),
            warmup,
            summary.mean_density,
            summary.mean_flow,
            summary.mean_speed
        );
        Ok(MetricsReport { steps, summary })
    }
}

fn summarize(window: &[StepMetrics], warmup_steps: u32) -> RunMetrics {
    let n = window.len() as f64;
    let mean = |f: fn(&StepMetrics) -> f64| window.iter().map(f).sum::<f64>() / n;
    let total_crossings: u64 = window.iter().map(|m| m.crossings as u64).sum();

    RunMetrics {
        warmup_steps,
        averaged_steps: window.len() as u32,
        mean_density: mean(|m| m.density),
        mean_flow: mean(|m| m.flow),
        mean_speed: mean(|m| m.mean_speed),
        mean_relative_speed: mean(|m| m.relative_speed),
        mean_jam_fraction: mean(|m| m.jam_fraction),
        mean_throughput: mean(|m| m.throughput as f64),
        total_crossings,
        measured_flow: total_crossings as f64 / n,
    }
}
