use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use traffic_common::{MetricsReport, OutputFormat, RunRecord};

/// Path of the run file for `base_filename` in the given format.
pub fn run_path(base_filename: &str, format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("{}_run.{}", base_filename, format.extension()))
}

/// Path of the per-step metrics table for `base_filename`.
pub fn metrics_csv_path(base_filename: &str) -> PathBuf {
    PathBuf::from(format!("{}_metrics.csv", base_filename))
}

/// Writes the full run (parameters, seed, snapshots and metrics) so it can be
/// replayed later. Returns the path written.
pub fn save_run(record: &RunRecord, base_filename: &str, format: OutputFormat) -> Result<PathBuf> {
    let path = run_path(base_filename, format);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create run file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => serde_json::to_writer(&mut writer, record)
            .with_context(|| format!("Failed to serialize run to JSON '{}'", path.display()))?,
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, record)
            .with_context(|| format!("Failed to serialize run to bincode '{}'", path.display()))?,
        OutputFormat::MessagePack => rmp_serde::encode::write(&mut writer, record)
            .with_context(|| format!("Failed to serialize run to MessagePack '{}'", path.display()))?,
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write run file '{}'", path.display()))?;

    info!(
        "Run with {} snapshots saved to {} ({:?} format)",
        record.snapshots.len(),
        path.display(),
        format
    );
    Ok(path)
}

/// Reads a run written by [`save_run`], picking the format from the file extension.
pub fn load_run<P: AsRef<Path>>(path: P) -> Result<RunRecord> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let format = OutputFormat::from_extension(ext)
        .with_context(|| format!("Unknown run file extension '{}' for '{}'", ext, path.display()))?;

    let file = File::open(path).with_context(|| format!("Failed to open run file '{}'", path.display()))?;
    let reader = BufReader::new(file);
    let record: RunRecord = match format {
        OutputFormat::Json => serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse JSON run '{}'", path.display()))?,
        OutputFormat::Bincode => bincode::deserialize_from(reader)
            .with_context(|| format!("Failed to decode bincode run '{}'", path.display()))?,
        OutputFormat::MessagePack => rmp_serde::from_read(reader)
            .with_context(|| format!("Failed to decode MessagePack run '{}'", path.display()))?,
    };
    info!("Loaded run with {} snapshots from {}", record.snapshots.len(), path.display());
    Ok(record)
}

/// Writes one CSV row of metrics per step, for plotting.
pub fn write_metrics_csv<P: AsRef<Path>>(report: &MetricsReport, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create metrics CSV '{}'", path.display()))?;
    for step in &report.steps {
        writer
            .serialize(step)
            .with_context(|| format!("Failed to write metrics row for step {} to '{}'", step.step, path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush metrics CSV '{}'", path.display()))?;
    info!("Per-step metrics saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::simulate;
    use traffic_common::SimulationConfig;

    fn sample_record() -> RunRecord {
        let config = SimulationConfig::from_toml_str(
            r#"
            [road]
            length = 40
            [vehicles]
            count = 10
            max_speed = 3
            [dynamics]
            slowdown_probability = 0.2
            [run]
            steps = 15
            "#,
        )
        .unwrap();
        simulate(&config, 21).unwrap()
    }

    fn temp_base(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("traffic-engine-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("test").to_string_lossy().into_owned()
    }

    #[test]
    fn test_binary_formats_load_back_identical() {
        let record = sample_record();
        for format in [OutputFormat::Bincode, OutputFormat::MessagePack] {
            let base = temp_base(&format!("{:?}", format));
            let path = save_run(&record, &base, format).unwrap();
            assert_eq!(path.extension().unwrap(), format.extension());
            let loaded = load_run(&path).unwrap();
            assert_eq!(loaded, record);
        }
    }

    #[test]
    fn test_json_run_loads_back() {
        let record = sample_record();
        let base = temp_base("json");
        let path = save_run(&record, &base, OutputFormat::Json).unwrap();
        let loaded = load_run(&path).unwrap();
        assert_eq!(loaded.seed, record.seed);
        assert_eq!(loaded.snapshots, record.snapshots);
        assert_eq!(loaded.params.road_length, 40);
        assert_eq!(loaded.snapshot(3), record.snapshot(3));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let base = temp_base("unknown");
        let path = PathBuf::from(format!("{base}.txt"));
        std::fs::write(&path, b"not a run").unwrap();
        assert!(load_run(&path).is_err());
    }

    #[test]
    fn test_metrics_csv_has_a_row_per_step() {
        let record = sample_record();
        let path = metrics_csv_path(&temp_base("csv"));
        write_metrics_csv(&record.metrics, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "step");
        assert!(headers.iter().any(|h| h == "flow"));
        assert_eq!(reader.records().count(), 16);
    }

    #[test]
    fn test_metrics_csv_error_names_the_path() {
        let record = sample_record();
        let path = std::env::temp_dir()
            .join(format!("traffic-engine-no-such-dir-{}", std::process::id()))
            .join("metrics.csv");
        let err = write_metrics_csv(&record.metrics, &path).unwrap_err();
        assert!(format!("{err:#}").contains(&path.display().to_string()));
    }
}
