use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use stairspeed_core::prelude::DecodePolicy;

use crate::config::{CompletionStrategy, RunnerConfig, DEFAULT_TAIL_LINES};
use crate::executable::executable_path;
use crate::types::StairSpeedResult;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct StairSpeedCli {
    /// The directory the speed test runs in. Relative paths below are resolved against it.
    #[clap(long, env = "STAIRSPEED_WORK_DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Path to the speed test executable.
    ///
    /// Defaults to `$STAIRSPEED_EXE`, then the executable in the work directory, then the one on
    /// the user's `PATH`.
    #[clap(long)]
    pub exe: Option<PathBuf>,

    /// A program to start the executable with, such as `wine`.
    #[clap(long, env = "STAIRSPEED_LAUNCHER")]
    pub launcher: Option<PathBuf>,

    /// Directory the executable writes its log files to.
    #[clap(long, default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Directory the executable writes its result files to.
    #[clap(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// File with the targets to test, one per line. Lines starting with `#` are ignored.
    #[clap(long, short, default_value = "urls.txt")]
    pub url_list: PathBuf,

    /// How to tell that a run finished normally: `stream` watches the executable's JSON output
    /// for the end of test message, `log-marker` waits for it to exit and checks its log file.
    #[clap(long, default_value = "stream")]
    pub strategy: CompletionStrategy,

    /// The number of seconds a single target may run before it is killed.
    #[clap(long, default_value = "1800")]
    pub timeout: u64,

    /// The number of output lines to keep and print when a run does not complete.
    #[clap(long, default_value_t = DEFAULT_TAIL_LINES)]
    pub tail_lines: usize,

    /// What to do with text that isn't valid UTF-8: `replace` or `drop` it.
    #[clap(long, default_value = "replace")]
    pub decode: DecodePolicy,

    /// File to append a JSON summary of each run to.
    #[clap(long, env = "RUN_SUMMARY_PATH", default_value = "run_summary.jsonl")]
    pub run_summary: PathBuf,

    /// Do not write run summaries.
    #[clap(long, default_value = "false")]
    pub no_summary: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by
    /// anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Extra arguments passed to the executable after the target, given after `--`.
    #[clap(last = true)]
    pub extra_args: Vec<String>,
}

impl StairSpeedCli {
    /// Resolve the executable and turn the options into a [`RunnerConfig`].
    pub fn into_config(self) -> StairSpeedResult<RunnerConfig> {
        let work_dir = std::path::absolute(&self.work_dir).with_context(|| {
            format!("Invalid work directory '{}'", self.work_dir.display())
        })?;

        let executable = match &self.exe {
            Some(exe) => exe.clone(),
            None => executable_path(&work_dir)?,
        };

        let mut config = RunnerConfig::new(work_dir)
            .with_executable(executable)
            .with_logs_dir(&self.logs_dir)
            .with_results_dir(&self.results_dir)
            .with_url_list(&self.url_list)
            .with_strategy(self.strategy)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_tail_lines(self.tail_lines)
            .with_decode_policy(self.decode)
            .with_extra_args(self.extra_args);
        if let Some(launcher) = self.launcher {
            config = config.with_launcher(launcher);
        }
        if !self.no_summary {
            config = config.with_run_summary_path(&self.run_summary);
        }

        Ok(config)
    }
}
