use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use stairspeed_core::prelude::{CompletionSentinel, DecodePolicy, LogMarker};

use crate::executable::DEFAULT_EXECUTABLE_NAME;

/// Default time allowed for a single run before the process is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Default number of trailing output lines kept for diagnostics.
pub const DEFAULT_TAIL_LINES: usize = 50;

/// How the driver decides that the executable finished normally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionStrategy {
    /// Run in RPC mode and watch the output stream for the [`CompletionSentinel`].
    #[default]
    StreamSentinel,
    /// Run in CLI mode to the end, then look for the [`LogMarker`] in the new log file.
    LogMarker,
}

impl FromStr for CompletionStrategy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream" => Ok(CompletionStrategy::StreamSentinel),
            "log-marker" => Ok(CompletionStrategy::LogMarker),
            _ => Err("Unknown completion strategy, expected 'stream' or 'log-marker'"),
        }
    }
}

impl fmt::Display for CompletionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionStrategy::StreamSentinel => write!(f, "stream"),
            CompletionStrategy::LogMarker => write!(f, "log-marker"),
        }
    }
}

/// Everything the driver, correlator and batch need to know about the environment the executable
/// runs in.
///
/// Build one with [`RunnerConfig::new`] and the `with_*` methods, or from the command line via
/// [`crate::cli::StairSpeedCli::into_config`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// The speed test executable.
    pub executable: PathBuf,
    /// A program that hosts the executable, such as `wine`. The executable path becomes its first
    /// argument.
    pub launcher: Option<PathBuf>,
    /// Working directory of the process.
    pub work_dir: PathBuf,
    /// Where the executable writes its `*.log` log files.
    pub logs_dir: PathBuf,
    /// Where the executable writes its `*.log` result files.
    pub results_dir: PathBuf,
    /// The list of targets to run, one per line.
    pub url_list: PathBuf,
    /// Where to append a [`stairspeed_summary_model::RunSummary`] per run. Not written if [`None`].
    pub run_summary_path: Option<PathBuf>,
    pub strategy: CompletionStrategy,
    /// The flag that precedes the target argument.
    pub target_flag: String,
    /// The flag that switches the executable to streamed JSON output.
    pub rpc_flag: String,
    /// Extra arguments appended to every invocation.
    pub extra_args: Vec<String>,
    pub timeout: Duration,
    /// How long to sleep when no output line is ready.
    pub poll_interval: Duration,
    /// How long to wait for the process to exit once its output has closed, or for its output to
    /// close once it has exited, before giving up on it.
    pub exit_grace: Duration,
    pub tail_lines: usize,
    pub sentinel: CompletionSentinel,
    pub log_marker: LogMarker,
    pub decode_policy: DecodePolicy,
}

impl RunnerConfig {
    /// A configuration with the executable's default layout under `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            executable: work_dir.join(DEFAULT_EXECUTABLE_NAME),
            launcher: None,
            logs_dir: work_dir.join("logs"),
            results_dir: work_dir.join("results"),
            url_list: work_dir.join("urls.txt"),
            run_summary_path: None,
            strategy: CompletionStrategy::default(),
            target_flag: "/u".to_string(),
            rpc_flag: "/rpc".to_string(),
            extra_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: Duration::from_millis(50),
            exit_grace: Duration::from_secs(5),
            tail_lines: DEFAULT_TAIL_LINES,
            sentinel: CompletionSentinel::default(),
            log_marker: LogMarker::default(),
            decode_policy: DecodePolicy::default(),
            work_dir,
        }
    }

    pub fn with_executable(mut self, path: impl AsRef<Path>) -> Self {
        self.executable = self.resolve(path);
        self
    }

    pub fn with_launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    pub fn with_logs_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.logs_dir = self.resolve(path);
        self
    }

    pub fn with_results_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.results_dir = self.resolve(path);
        self
    }

    pub fn with_url_list(mut self, path: impl AsRef<Path>) -> Self {
        self.url_list = self.resolve(path);
        self
    }

    pub fn with_run_summary_path(mut self, path: impl AsRef<Path>) -> Self {
        self.run_summary_path = Some(self.resolve(path));
        self
    }

    pub fn with_strategy(mut self, strategy: CompletionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }

    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    /// Paths relative to the working directory are resolved against it.
    fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.work_dir.join(path)
    }
}
