use serde::{Deserialize, Serialize};

use crate::metrics::MetricsReport;
use crate::sim_params::RoadParams;
use crate::snapshot::Snapshot;

/// Everything a replay needs: the parameters, the seed that reproduces the
/// trajectory, every snapshot and the metrics derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub params: RoadParams,
    pub seed: u64,
    pub snapshots: Vec<Snapshot>,
    pub metrics: MetricsReport,
}

impl RunRecord {
    /// Number of update steps, not counting the initial snapshot.
    pub fn num_steps(&self) -> usize {
        self.snapshots.len().saturating_sub(1)
    }

    pub fn snapshot(&self, step: usize) -> Option<&Snapshot> {
        self.snapshots.get(step)
    }
}
