use crate::metrics::MetricsAggregator;
use crate::road::RoadState;
use crate::scenario::ScenarioBuilder;
use crate::update::{NagelSchreckenberg, UpdateRule};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use traffic_common::{RunRecord, SimError, SimulationConfig, Snapshot};

/// Seconds between progress lines while stepping.
const PRINT_INTERVAL_SECS: f64 = 5.0;

/// Drives an update rule over a road, one step at a time, recording a
/// snapshot of every state it passes through.
pub struct SimulationRunner<R: UpdateRule = NagelSchreckenberg> {
    /// The most recent road state.
    state: RoadState,
    rule: R,
    /// The run's single random stream, seeded once.
    rng: StdRng,
    seed: u64,
    /// Number of update steps applied so far.
    current_step: u32,
    recorded_snapshots: Vec<Snapshot>,
}

impl SimulationRunner<NagelSchreckenberg> {
    /// Runner using the standard Nagel-Schreckenberg rule.
    pub fn nagel_schreckenberg(initial_state: RoadState, seed: u64) -> Result<Self, SimError> {
        Self::new(initial_state, NagelSchreckenberg, seed)
    }
}

impl<R: UpdateRule> SimulationRunner<R> {
    /// Checks the initial state and prepares a runner at step 0. Nothing is
    /// recorded yet; call [`SimulationRunner::record_snapshot`] or
    /// [`SimulationRunner::run_steps`].
    pub fn new(initial_state: RoadState, rule: R, seed: u64) -> Result<Self, SimError> {
        Self::with_rng(initial_state, rule, seed, StdRng::seed_from_u64(seed))
    }

    /// Like [`SimulationRunner::new`], but continues an existing stream, e.g.
    /// the one that placed the vehicles. `seed` is the seed that stream
    /// started from.
    pub fn with_rng(initial_state: RoadState, rule: R, seed: u64, rng: StdRng) -> Result<Self, SimError> {
        check_runnable(&initial_state)?;
        Ok(Self {
            state: initial_state,
            rule,
            rng,
            seed,
            current_step: 0,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Advances the road by one synchronous update.
    pub fn step(&mut self) -> Result<(), SimError> {
        let next = self.rule.next_state(&self.state, &mut self.rng).map_err(|e| match e {
            SimError::InvariantViolation(msg) => {
                SimError::invariant(format!("step {}: {}", self.current_step + 1, msg))
            }
            other => other,
        })?;
        self.state = next;
        self.current_step += 1;
        Ok(())
    }

    /// Stores a snapshot of the current state.
    pub fn record_snapshot(&mut self) {
        trace!("Recording snapshot at step {}", self.current_step);
        self.recorded_snapshots.push(self.state.snapshot(self.current_step));
    }

    /// Records the current state, then steps `num_steps` times recording
    /// after each step.
    pub fn run_steps(&mut self, num_steps: u32) -> Result<(), SimError> {
        self.recorded_snapshots.reserve(num_steps as usize + 1);
        self.record_snapshot();

        let start_time = Instant::now();
        let mut previous_print_time = start_time;
        for i in 0..num_steps {
            let step_start_time = Instant::now();
            self.step()?;
            self.record_snapshot();

            let step_duration = step_start_time.elapsed();
            let now = Instant::now();
            let is_last_step = i + 1 == num_steps;
            if now.duration_since(previous_print_time).as_secs_f64() >= PRINT_INTERVAL_SECS || is_last_step {
                info!(
                    "Step [{}/{}] | Vehicles: {} | Step Time: {:6.3} ms | Elapsed: {:.2} s",
                    i + 1,
                    num_steps,
                    self.state.vehicle_count(),
                    step_duration.as_secs_f64() * 1000.0,
                    start_time.elapsed().as_secs_f64()
                );
                previous_print_time = now;
            } else {
                trace!(
                    "Step [{}/{}] completed in {:.3} ms",
                    i + 1,
                    num_steps,
                    step_duration.as_secs_f64() * 1000.0
                );
            }
        }
        Ok(())
    }

    pub fn state(&self) -> &RoadState {
        &self.state
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.recorded_snapshots
    }
}

/// Rejects initial states the update rule cannot run on.
fn check_runnable(state: &RoadState) -> Result<(), SimError> {
    let params = state.params();
    params.validate()?;
    if state.is_empty() {
        return Err(SimError::invalid_config("road has no vehicles"));
    }
    if state.vehicle_count() > params.road_length as usize {
        return Err(SimError::invalid_config(format!(
            "road length {} is shorter than the vehicle count {}",
            params.road_length,
            state.vehicle_count()
        )));
    }
    state.validate()
}

/// Runs the standard rule for `num_steps` steps and returns `num_steps + 1`
/// snapshots, the initial state first. On error nothing is returned.
pub fn run(initial_state: RoadState, num_steps: u32, seed: u64) -> Result<Vec<Snapshot>, SimError> {
    let mut runner = SimulationRunner::nagel_schreckenberg(initial_state, seed)?;
    runner.run_steps(num_steps)?;
    Ok(runner.into_snapshots())
}

/// Returns the configured seed, or draws a fresh one from OS entropy.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => seed,
        None => {
            let seed = rand::rng().random::<u64>();
            info!("No seed configured, generated seed {} (set run.seed to reproduce).", seed);
            seed
        }
    }
}

/// Builds the scenario, runs it and aggregates the metrics for a validated
/// configuration. Placement and dynamics share one stream seeded from `seed`.
pub fn simulate(config: &SimulationConfig, seed: u64) -> Result<RunRecord, SimError> {
    config.validate()?;
    let params = config.road_params()?;
    let num_steps = config.steps()?;
    debug!("Road parameters: {:?}", params);

    let mut rng = StdRng::seed_from_u64(seed);
    let initial_state = ScenarioBuilder::from_config(config)?.build_with_rng(&mut rng)?;
    info!(
        "Simulating {} vehicles on {} cells for {} steps (seed {}).",
        initial_state.vehicle_count(),
        params.road_length,
        num_steps,
        seed
    );
    let mut runner = SimulationRunner::with_rng(initial_state, NagelSchreckenberg, seed, rng)?;
    runner.run_steps(num_steps)?;
    let snapshots = runner.into_snapshots();

    let aggregator = MetricsAggregator::new(params, config.metrics.clone())?;
    let metrics = aggregator.aggregate(&snapshots)?;
    info!(
        "Run averages: density {:.3}, flow {:.3}, mean speed {:.3}, jammed {:.1}%",
        metrics.summary.mean_density,
        metrics.summary.mean_flow,
        metrics.summary.mean_speed,
        metrics.summary.mean_jam_fraction * 100.0
    );

    Ok(RunRecord { params, seed, snapshots, metrics })
}
