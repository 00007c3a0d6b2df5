use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;

use traffic_common::{OutputFormat, RunRecord, SimulationConfig};
use traffic_engine::output::{load_run, metrics_csv_path, save_run, write_metrics_csv};
use traffic_engine::simulation::{resolve_seed, simulate};

/// Command-line arguments for the traffic engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulation config file (.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Random seed, overriding `run.seed`
    #[arg(long)]
    seed: Option<u64>,

    /// Number of time steps, overriding `run.steps`
    #[arg(long)]
    steps: Option<i64>,

    /// Base filename for output files, overriding `output.base_filename`
    #[arg(short, long)]
    output: Option<String>,

    /// Run file format: json, bincode or messagepack
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Print the summary of a previously saved run instead of simulating
    #[arg(long)]
    load: Option<PathBuf>,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_extension(s).ok_or_else(|| format!("unknown format '{s}' (json, bincode, messagepack)"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run_with_args(args) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run_with_args(args: Args) -> Result<()> {
    if let Some(path) = &args.load {
        let record = load_run(path)?;
        log_summary(&record);
        return Ok(());
    }

    info!("Starting Traffic Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if let Some(base) = args.output {
        config.output.base_filename = base;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    config.validate()?;
    info!("Loaded configuration from {}", args.config.display());

    // --- Simulate ---
    let seed = resolve_seed(config.run.seed);
    let start_time = Instant::now();
    let record = simulate(&config, seed)?;
    info!("Simulation finished in {:.3} seconds.", start_time.elapsed().as_secs_f64());
    log_summary(&record);

    // --- Save Recorded Data ---
    let base = &config.output.base_filename;
    if config.output.save_snapshots {
        save_run(&record, base, config.output.format)?;
    } else {
        info!("Skipping saving the run as per config (save_snapshots is false).");
    }
    if config.output.save_metrics_csv {
        write_metrics_csv(&record.metrics, metrics_csv_path(base))?;
    } else {
        info!("Skipping saving per-step metrics as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

fn log_summary(record: &RunRecord) {
    let summary = &record.metrics.summary;
    let vehicles = record.snapshots.first().map_or(0, |s| s.vehicle_count());
    info!(
        "Road: {} cells, {} vehicles, v_max {}, p {} | Seed: {} | Steps: {}",
        record.params.road_length,
        vehicles,
        record.params.max_speed,
        record.params.slowdown_probability,
        record.seed,
        record.num_steps()
    );
    info!(
        "Averaged over {} steps after {} warm-up: density {:.3}, flow {:.3}, speed {:.3} ({:.1}% of v_max)",
        summary.averaged_steps,
        summary.warmup_steps,
        summary.mean_density,
        summary.mean_flow,
        summary.mean_speed,
        summary.mean_relative_speed * 100.0
    );
    info!(
        "Jammed: {:.1}% | Throughput: {:.2} vehicles | Boundary crossings: {} ({:.3} per step)",
        summary.mean_jam_fraction * 100.0,
        summary.mean_throughput,
        summary.total_crossings,
        summary.measured_flow
    );
}
