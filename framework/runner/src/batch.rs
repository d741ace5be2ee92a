//! Runs the speed test once for every target in a list.

use std::path::{Path, PathBuf};

use chrono::Utc;
use indicatif::ProgressBar;
use stairspeed_core::prelude::{BatchAbortError, DecodePolicy};
use stairspeed_results::{load_nodes, load_original_urls, NodeRecord};
use stairspeed_summary_model::{append_run_summary, RunSummary};

use crate::driver::{RunDriver, RunError};
use crate::outcome::{RunOutcome, RunRequest};
use crate::progress::start_progress;

/// Read the targets from a list file, one per line.
///
/// Lines are trimmed, and blank lines and lines starting with `#` are skipped. A list that can't
/// be read or has no targets aborts the batch.
pub fn read_targets(path: &Path, policy: DecodePolicy) -> Result<Vec<String>, BatchAbortError> {
    let bytes = std::fs::read(path).map_err(|e| {
        BatchAbortError::new(format!(
            "Failed to read target list '{}': {e}",
            path.display()
        ))
    })?;

    let targets = policy
        .decode(&bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect::<Vec<_>>();

    if targets.is_empty() {
        return Err(BatchAbortError::new(format!(
            "No targets in '{}'",
            path.display()
        )));
    }

    Ok(targets)
}

/// A finished run and the nodes read from its result file.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub nodes: Vec<NodeRecord>,
    /// Share links listed next to the result file.
    pub original_urls: Vec<String>,
}

impl RunReport {
    pub fn online_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.online).count()
    }
}

#[derive(Debug)]
pub struct TargetReport {
    pub target: String,
    pub result: Result<RunReport, RunError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub targets: Vec<TargetReport>,
    /// Set when the batch was stopped with Ctrl-C before every target had run.
    pub interrupted: bool,
}

impl BatchReport {
    /// Targets whose run signalled a normal completion.
    pub fn completed_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(&t.result, Ok(report) if report.outcome.completed))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.targets.len() - self.completed_count()
    }
}

/// Run every target in the driver's list file, one after the other.
///
/// Only a missing or empty target list is an error. Each target's failure is logged and recorded
/// in the returned [`BatchReport`] and the batch moves on to the next target.
pub async fn run_batch(
    driver: &RunDriver,
    show_progress: bool,
) -> Result<BatchReport, BatchAbortError> {
    let config = driver.config();
    let targets = read_targets(&config.url_list, config.decode_policy)?;
    log::info!(
        "Running {} target(s) from '{}'",
        targets.len(),
        config.url_list.display()
    );

    let progress = start_progress(targets.len(), show_progress);
    let mut report = BatchReport::default();
    for target in targets {
        progress.set_message(target.clone());
        // The executable runs in its own process group so it does not see the terminal's Ctrl-C.
        // Dropping the running target kills it.
        let result = tokio::select! {
            result = run_target(driver, &target, &progress) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(result) = result else {
            progress.suspend(|| log::warn!("Interrupted while testing '{target}', stopping"));
            report.interrupted = true;
            break;
        };
        report.targets.push(TargetReport { target, result });
        progress.inc(1);
    }
    progress.finish_and_clear();

    log::info!(
        "Batch finished: {} completed, {} failed",
        report.completed_count(),
        report.failed_count()
    );
    Ok(report)
}

async fn run_target(
    driver: &RunDriver,
    target: &str,
    progress: &ProgressBar,
) -> Result<RunReport, RunError> {
    let config = driver.config();
    let request = RunRequest::from_config(target, config);
    let started_at = Utc::now();

    progress.suspend(|| log::info!("[RUN] {target}"));
    let outcome = match driver.run(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Speed test for '{target}' failed to start: {e}");
            record_summary(driver, &request, started_at, None);
            return Err(e);
        }
    };

    let (nodes, original_urls) = match &outcome.result_file {
        Some(path) => (
            load_nodes(path, config.decode_policy),
            load_original_urls(path, config.decode_policy),
        ),
        None => (Vec::new(), Vec::new()),
    };
    let report = RunReport {
        outcome,
        nodes,
        original_urls,
    };

    progress.suspend(|| log_report(&report));
    record_summary(driver, &request, started_at, Some(&report));
    Ok(report)
}

fn log_report(report: &RunReport) {
    let outcome = &report.outcome;
    log::info!(
        "exit code: {}, completed: {}, timed out: {}, took {:.1}s",
        outcome.exit_code,
        outcome.completed,
        outcome.timed_out,
        outcome.elapsed.as_secs_f64()
    );

    if !outcome.completed {
        log::warn!("Speed test for '{}' did not complete", outcome.target);
        if !outcome.tail.is_empty() {
            log::info!("Last {} line(s) of output:", outcome.tail.len());
            for line in &outcome.tail {
                log::info!("  {line}");
            }
        }
    }

    if outcome.new_logs.is_empty() {
        log::info!("No new log files");
    } else {
        log::info!("New log files: {}", display_paths(&outcome.new_logs));
    }

    match &outcome.result_file {
        Some(path) => log::info!(
            "Result file: {} ({} node section(s), {} online)",
            path.display(),
            report.nodes.len(),
            report.online_count()
        ),
        None => log::warn!("No result file for '{}'", outcome.target),
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append a [`RunSummary`] for the run if a summary path is configured. A run that failed to
/// start is recorded with the defaults of an incomplete run.
fn record_summary(
    driver: &RunDriver,
    request: &RunRequest,
    started_at: chrono::DateTime<Utc>,
    report: Option<&RunReport>,
) {
    let config = driver.config();
    let Some(path) = &config.run_summary_path else {
        return;
    };

    let mut summary = RunSummary::new(
        nanoid::nanoid!(),
        request.target().to_string(),
        config.strategy.to_string(),
        request.extra_args().to_vec(),
        started_at.timestamp(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    summary.add_setting("timeout_s".to_string(), request.timeout().as_secs().to_string());
    summary.add_setting("decode_policy".to_string(), config.decode_policy.to_string());
    if let Some(launcher) = &config.launcher {
        summary.add_setting("launcher".to_string(), launcher.display().to_string());
    }

    if let Some(report) = report {
        let outcome = &report.outcome;
        summary.started_at = outcome.started_at.timestamp();
        summary.elapsed_ms = outcome.elapsed.as_millis() as u64;
        summary.completed = outcome.completed;
        summary.timed_out = outcome.timed_out;
        summary.exit_code = outcome.exit_code;
        summary.new_logs = outcome.new_logs.clone();
        summary.result_file = outcome.result_file.clone();
        summary.node_count = report.nodes.len();
        summary.online_count = report.online_count();
    }

    if let Err(e) = append_run_summary(&summary, path.clone()) {
        log::error!(
            "Failed to append run summary to '{}': {e:?}",
            path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_should_read_targets_skipping_comments_and_blanks() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("urls.txt");
        std::fs::write(
            &list,
            "# subscriptions\n\n  https://a.example/sub  \r\n#https://skipped.example\nvmess://abc\n",
        )
        .unwrap();

        let targets = read_targets(&list, DecodePolicy::Replace).unwrap();
        assert_eq!(targets, vec!["https://a.example/sub", "vmess://abc"]);
    }

    #[test]
    fn test_should_abort_on_missing_list() {
        let dir = TempDir::new().unwrap();
        let err = read_targets(&dir.path().join("urls.txt"), DecodePolicy::Replace).unwrap_err();
        assert!(err.message().contains("Failed to read target list"));
    }

    #[test]
    fn test_should_abort_on_list_without_targets() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("urls.txt");
        std::fs::write(&list, "\n# only a comment\n   \n").unwrap();

        let err = read_targets(&list, DecodePolicy::Replace).unwrap_err();
        assert!(err.message().starts_with("No targets"));
    }

    #[test]
    fn test_should_decode_invalid_bytes_in_list() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("urls.txt");
        std::fs::write(&list, b"https://a.example/\xffsub\n").unwrap();

        assert_eq!(
            read_targets(&list, DecodePolicy::Drop).unwrap(),
            vec!["https://a.example/sub"]
        );
    }
}
