use serde::{Deserialize, Serialize};
use stairspeed_summary_model::RunSummary;

/// A run summary together with the statistics computed from its result file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryOutput {
    pub run_summary: RunSummary,
    pub stats: RunStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunStats {
    pub node_count: usize,
    pub online_count: usize,
    /// Mean of all non-zero ping samples across the run's nodes, in milliseconds.
    pub mean_ping_ms: Option<f64>,
    pub best_node: Option<BestNode>,
}

/// The node with the highest single speed sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BestNode {
    pub section: String,
    pub remarks: String,
    /// Peak `RawSpeed` sample, in bytes per second.
    pub peak_speed: u64,
}
