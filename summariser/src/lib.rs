use stairspeed_core::prelude::DecodePolicy;
use stairspeed_results::load_nodes;
use stairspeed_summary_model::RunSummary;

use crate::model::SummaryOutput;

pub mod filter;
pub mod model;
mod stats;
mod table;

pub use table::render_table;

/// Reload the result file of a run and compute its statistics.
///
/// A run without a result file, or whose result file can no longer be read, is summarised as
/// having no nodes.
pub fn summarise_run(run_summary: RunSummary, policy: DecodePolicy) -> SummaryOutput {
    let nodes = match &run_summary.result_file {
        Some(path) => load_nodes(path, policy),
        None => {
            log::debug!("No result file for run {}", run_summary.run_id);
            Vec::new()
        }
    };

    SummaryOutput {
        stats: stats::run_stats(&nodes),
        run_summary,
    }
}
