use anyhow::Context;
use chrono::Utc;
use log::debug;
use stairspeed_core::prelude::DecodePolicy;
use stairspeed_summariser::{filter, render_table, summarise_run};
use stairspeed_summary_model::load_summary_runs;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable name to set a custom run summary file path
const RUN_SUMMARY_PATH_ENV: &str = "RUN_SUMMARY_PATH";
/// Default path for the run summary file
const DEFAULT_RUN_SUMMARY_PATH: &str = "run_summary.jsonl";
/// Environment variable name to choose how invalid text in result files is decoded
const DECODE_POLICY_ENV: &str = "STAIRSPEED_DECODE";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let summary_path = std::env::var(RUN_SUMMARY_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_RUN_SUMMARY_PATH));
    let policy = match std::env::var(DECODE_POLICY_ENV) {
        Ok(value) => DecodePolicy::from_str(&value).map_err(anyhow::Error::msg)?,
        Err(_) => DecodePolicy::default(),
    };

    debug!("Loading summary from {}", summary_path.display());
    let summary_runs = load_summary_runs(summary_path.clone()).with_context(|| {
        format!("Failed to load run summaries from '{}'", summary_path.display())
    })?;

    let latest_by_config_summaries =
        filter::latest_run_summaries_by_target_and_config(summary_runs);

    for (target, fingerprint, summary) in &latest_by_config_summaries {
        log::debug!("Selected summary for {target} ({fingerprint}): {summary:?}");
    }

    let summary_outputs = latest_by_config_summaries
        .into_iter()
        .map(|(_, _, summary)| summarise_run(summary, policy))
        .collect::<Vec<_>>();

    println!("{}", render_table(&summary_outputs));

    let report_path = format!(
        "summariser-report-{}.json",
        Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ")
    );
    let report = File::create_new(&report_path)
        .with_context(|| format!("Failed to create report '{report_path}'"))?;
    serde_json::to_writer_pretty(report, &summary_outputs)?;
    log::info!("Wrote {} summaries to {report_path}", summary_outputs.len());

    Ok(())
}
