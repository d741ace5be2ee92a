use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

/// Summary of a single speed test run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run.
    pub run_id: String,
    /// The target that was tested, usually a subscription URL
    pub target: String,
    /// The completion strategy used to detect the end of the run
    pub strategy: String,
    /// Extra arguments passed to the executable after the target
    pub extra_args: Vec<String>,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// How long the run took, in milliseconds
    pub elapsed_ms: u64,
    /// Whether the executable signalled a normal completion
    pub completed: bool,
    /// Whether the run was stopped because it hit the timeout
    pub timed_out: bool,
    /// Exit code of the executable, `-1` if it was killed or reported none
    pub exit_code: i32,
    /// Log files created during the run, newest first
    pub new_logs: Vec<PathBuf>,
    /// The result file selected for this run
    ///
    /// Not set if the run produced no result file, for example because every node failed.
    pub result_file: Option<PathBuf>,
    /// The number of nodes parsed from [RunSummary::result_file]
    pub node_count: usize,
    /// The number of those nodes that were reported online
    pub online_count: usize,
    /// Runner settings that affect the outcome of a run, such as the timeout
    pub settings: HashMap<String, String>,
    /// The version of the runner that produced this summary
    pub runner_version: String,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(
        run_id: String,
        target: String,
        strategy: String,
        extra_args: Vec<String>,
        started_at: i64,
        runner_version: String,
    ) -> Self {
        Self {
            run_id,
            target,
            strategy,
            extra_args,
            started_at,
            elapsed_ms: 0,
            completed: false,
            timed_out: false,
            exit_code: -1,
            new_logs: Vec::new(),
            result_file: None,
            node_count: 0,
            online_count: 0,
            settings: HashMap::with_capacity(0),
            runner_version,
        }
    }

    /// Add a runner setting
    pub fn add_setting(&mut self, key: String, value: String) {
        self.settings.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to uniquely identify the configuration a target was tested
    /// with. It uses the
    ///     - Target
    ///     - Strategy
    ///     - Extra arguments, in order
    ///     - Runner settings
    ///     - Runner version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256]. Every value is prefixed with its
    /// length, so `["ab"]` and `["a", "b"]` give different fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        update_field(&mut hasher, &self.target);
        update_field(&mut hasher, &self.strategy);
        Digest::update(&mut hasher, (self.extra_args.len() as u64).to_le_bytes());
        for arg in &self.extra_args {
            update_field(&mut hasher, arg);
        }
        self.settings
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                update_field(&mut hasher, k);
                update_field(&mut hasher, v);
            });
        update_field(&mut hasher, &self.runner_version);

        format!("{:x}", hasher.finalize())
    }
}

fn update_field(hasher: &mut sha3::Sha3_256, value: &str) {
    Digest::update(hasher, (value.len() as u64).to_le_bytes());
    Digest::update(hasher, value.as_bytes());
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: PathBuf) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary]. Blank lines are skipped.
pub fn load_summary_runs(path: PathBuf) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(target: &str) -> RunSummary {
        RunSummary::new(
            "run-1".to_string(),
            target.to_string(),
            "stream".to_string(),
            vec!["--parse-threads".to_string(), "4".to_string()],
            1_760_000_000,
            "0.1.0".to_string(),
        )
    }

    #[test]
    fn test_should_default_to_incomplete() {
        let summary = sample("https://example.com/sub");
        assert!(!summary.completed);
        assert_eq!(summary.exit_code, -1);
        assert_eq!(summary.result_file, None);
    }

    #[test]
    fn test_fingerprint_ignores_run_specific_values() {
        let mut a = sample("https://example.com/sub");
        let mut b = sample("https://example.com/sub");
        b.run_id = "run-2".to_string();
        b.started_at += 60;
        b.completed = true;
        b.node_count = 12;
        a.add_setting("timeout_s".to_string(), "1800".to_string());
        a.add_setting("decode".to_string(), "replace".to_string());
        b.add_setting("decode".to_string(), "replace".to_string());
        b.add_setting("timeout_s".to_string(), "1800".to_string());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_depends_on_configuration() {
        let a = sample("https://example.com/sub");
        assert_ne!(a.fingerprint(), sample("https://example.com/other").fingerprint());

        let mut b = sample("https://example.com/sub");
        b.strategy = "log-marker".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());

        let mut c = sample("https://example.com/sub");
        c.extra_args.reverse();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_separates_neighbouring_values() {
        let mut joined = sample("https://example.com/sub");
        joined.extra_args = vec!["ab".to_string()];
        let mut split = sample("https://example.com/sub");
        split.extra_args = vec!["a".to_string(), "b".to_string()];
        assert_ne!(joined.fingerprint(), split.fingerprint());

        let mut key_heavy = sample("https://example.com/sub");
        key_heavy.add_setting("ab".to_string(), "c".to_string());
        let mut value_heavy = sample("https://example.com/sub");
        value_heavy.add_setting("a".to_string(), "bc".to_string());
        assert_ne!(key_heavy.fingerprint(), value_heavy.fingerprint());
    }

    #[test]
    fn test_should_append_and_load_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.jsonl");

        let first = sample("https://example.com/a");
        let mut second = sample("https://example.com/b");
        second.result_file = Some(PathBuf::from("results/20261019-101500.log"));
        second.node_count = 3;

        append_run_summary(&first, path.clone()).unwrap();
        append_run_summary(&second, path.clone()).unwrap();

        let loaded = load_summary_runs(path).unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn test_should_round_trip_through_writer() {
        let summary = sample("https://example.com/a");
        let mut buf = Vec::new();
        store_run_summary(&summary, &mut buf).unwrap();
        assert_eq!(load_run_summary(buf.as_slice()).unwrap(), summary);
    }

    #[test]
    fn test_should_fail_on_invalid_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();
        assert!(load_summary_runs(path).is_err());
    }
}
