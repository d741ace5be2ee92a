use itertools::Itertools;
use stairspeed_summary_model::RunSummary;

/// Keep only the latest run for each target and configuration, returned as
/// `(target, fingerprint, summary)` ordered by target and then fingerprint.
pub fn latest_run_summaries_by_target_and_config(
    summary_runs: Vec<RunSummary>,
) -> Vec<(String, String, RunSummary)> {
    summary_runs
        .into_iter()
        .into_group_map_by(|summary| (summary.target.clone(), summary.fingerprint()))
        .into_iter()
        .filter_map(|((target, fingerprint), summaries)| {
            summaries
                .into_iter()
                .max_by_key(|summary| summary.started_at)
                .map(|summary| (target, fingerprint, summary))
        })
        .sorted_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .collect::<Vec<_>>()
}
