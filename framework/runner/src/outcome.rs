use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{CompletionStrategy, RunnerConfig};

/// Exit code reported when the process was killed or did not report one.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// A request to test one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    target: String,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl RunRequest {
    pub fn new(target: impl Into<String>, timeout: Duration, extra_args: Vec<String>) -> Self {
        Self {
            target: target.into(),
            timeout,
            extra_args,
        }
    }

    /// A request using the timeout and extra arguments from `config`.
    pub fn from_config(target: impl Into<String>, config: &RunnerConfig) -> Self {
        Self::new(target, config.timeout, config.extra_args.clone())
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }
}

/// What happened during one run of the executable.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub target: String,
    pub strategy: CompletionStrategy,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// The OS process id, if the platform reported one.
    pub pid: Option<u32>,
    /// Whether the executable signalled a normal completion. Always `false` if [`Self::timed_out`].
    pub completed: bool,
    pub timed_out: bool,
    /// The exit code, or [`UNKNOWN_EXIT_CODE`].
    pub exit_code: i32,
    /// The last lines of combined stdout and stderr, oldest first.
    pub tail: Vec<String>,
    /// Log files created during the run, newest first.
    pub new_logs: Vec<PathBuf>,
    /// Result files created during the run, newest first.
    pub new_results: Vec<PathBuf>,
    /// The newest entry of [`Self::new_results`].
    pub result_file: Option<PathBuf>,
}

/// Keeps only the last `capacity` lines pushed into it.
#[derive(Debug, Clone)]
pub(crate) struct TailBuffer {
    capacity: usize,
    lines: VecDeque<String>,
}

impl TailBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub(crate) fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}
