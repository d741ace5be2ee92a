//! Runs the speed test executable once per [`RunRequest`] and reports a [`RunOutcome`].

use std::io::{BufRead, BufReader, PipeReader};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use chrono::Utc;
use stairspeed_core::prelude::DecodePolicy;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TryRecvError, Receiver};
use tokio::time::{sleep, timeout, Instant};

use crate::config::{CompletionStrategy, RunnerConfig};
use crate::correlator;
use crate::outcome::{RunOutcome, RunRequest, TailBuffer, UNKNOWN_EXIT_CODE};

/// Log target for lines printed by the executable.
pub const OUTPUT_LOG_TARGET: &str = "stairspeedtest";

const OUTPUT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to capture output of the speed test process: {0}")]
    Output(#[source] std::io::Error),
}

/// How the process ended, before the filesystem has been looked at.
struct ProcessEnd {
    sentinel_seen: bool,
    timed_out: bool,
    exit_code: i32,
    tail: TailBuffer,
}

/// Launches the executable and decides whether each run completed.
#[derive(Debug, Clone)]
pub struct RunDriver {
    config: RunnerConfig,
}

impl RunDriver {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the executable once for `request`.
    ///
    /// Only a failure to start the process is returned as an error. Timeouts, non-zero exits and
    /// missing output files are all described by the returned [`RunOutcome`].
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunError> {
        let config = &self.config;
        let logs_before = correlator::snapshot(&config.logs_dir);
        let results_before = correlator::snapshot(&config.results_dir);

        let started_at = Utc::now();
        let started = Instant::now();
        let (mut child, output) = self.spawn(request)?;
        let pid = child.id();
        let group = ProcessGroupGuard(pid);
        log::debug!(
            "Speed test for '{}' running with PID: {pid:?}",
            request.target()
        );

        let output = forward_output(output, config.decode_policy)?;
        let end = match config.strategy {
            CompletionStrategy::StreamSentinel => {
                self.watch_stream(&mut child, output, request.timeout(), started)
                    .await
            }
            CompletionStrategy::LogMarker => {
                self.wait_for_exit(&mut child, output, request.timeout())
                    .await
            }
        };
        // Nothing the executable started may outlive the run or write into the next one.
        drop(group);

        let new_logs = correlator::new_files(&logs_before, &config.logs_dir);
        let new_results = correlator::new_files(&results_before, &config.results_dir);
        let result_file = correlator::select_result(&new_results);

        let completed = !end.timed_out
            && match config.strategy {
                CompletionStrategy::StreamSentinel => end.sentinel_seen,
                CompletionStrategy::LogMarker => self.find_log_marker(&new_logs),
            };

        Ok(RunOutcome {
            target: request.target().to_string(),
            strategy: config.strategy,
            started_at,
            elapsed: started.elapsed(),
            pid,
            completed,
            timed_out: end.timed_out,
            exit_code: end.exit_code,
            tail: end.tail.into_lines(),
            new_logs,
            new_results,
            result_file,
        })
    }

    /// The program that is actually started, the launcher if there is one.
    fn program(&self) -> &Path {
        self.config
            .launcher
            .as_deref()
            .unwrap_or(&self.config.executable)
    }

    fn command(&self, request: &RunRequest) -> Command {
        let config = &self.config;
        let mut command = Command::new(self.program());
        if config.launcher.is_some() {
            command.arg(&config.executable);
        }
        if config.strategy == CompletionStrategy::StreamSentinel && !config.rpc_flag.is_empty() {
            command.arg(&config.rpc_flag);
        }
        command
            .arg(&config.target_flag)
            .arg(request.target())
            .args(request.extra_args())
            .current_dir(&config.work_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        // A group of its own, so the proxy clients it starts can be killed with it.
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    /// Start the process with stdout and stderr sharing one pipe, so lines keep the order they
    /// were written in.
    fn spawn(&self, request: &RunRequest) -> Result<(Child, PipeReader), RunError> {
        log::info!(
            "Running speed test for '{}' ({})",
            request.target(),
            self.config.strategy
        );
        let (output, stdout) = std::io::pipe().map_err(RunError::Output)?;
        let stderr = stdout.try_clone().map_err(RunError::Output)?;

        let mut command = self.command(request);
        command.stdout(stdout).stderr(stderr);
        let child = command.spawn().map_err(|source| RunError::Launch {
            program: self.program().to_path_buf(),
            source,
        })?;
        // Close our copies of the write end, otherwise the output never ends.
        drop(command);

        Ok((child, output))
    }

    /// Read output until it closes, polling so that the timeout is checked even while the
    /// process is silent.
    async fn watch_stream(
        &self,
        child: &mut Child,
        mut output: Receiver<String>,
        limit: Duration,
        started: Instant,
    ) -> ProcessEnd {
        let config = &self.config;
        let mut tail = TailBuffer::new(config.tail_lines);
        let mut sentinel_seen = false;
        let mut exited_at: Option<Instant> = None;

        let timed_out = loop {
            if started.elapsed() >= limit {
                break true;
            }

            match output.try_recv() {
                Ok(line) => {
                    if config.sentinel.matches(&line) && !sentinel_seen {
                        log::debug!("Received completion sentinel");
                        sentinel_seen = true;
                    }
                    record_line(&mut tail, line);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break false,
                Err(TryRecvError::Empty) => {}
            }

            match exited_at {
                Some(at) if at.elapsed() >= config.exit_grace => {
                    log::warn!(
                        "Speed test process exited but its output is still open, no longer reading it"
                    );
                    break false;
                }
                Some(_) => {}
                None => match child.try_wait() {
                    Ok(Some(status)) => {
                        log::debug!("Speed test process finished with status: {status}");
                        exited_at = Some(Instant::now());
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("Failed to check the speed test process status: {e}"),
                },
            }

            sleep(config.poll_interval).await;
        };

        let exit_code = if timed_out {
            log::warn!("Speed test timed out after {limit:?}, killing the process");
            self.kill(child).await;
            UNKNOWN_EXIT_CODE
        } else {
            self.collect_exit(child).await
        };

        ProcessEnd {
            sentinel_seen,
            timed_out,
            exit_code,
            tail,
        }
    }

    /// Let the process run to its end, keeping its output, and kill it if it takes longer than
    /// `limit`.
    async fn wait_for_exit(
        &self,
        child: &mut Child,
        mut output: Receiver<String>,
        limit: Duration,
    ) -> ProcessEnd {
        let mut tail = TailBuffer::new(self.config.tail_lines);

        let waited = timeout(limit, async {
            let mut output_open = true;
            loop {
                tokio::select! {
                    line = output.recv(), if output_open => match line {
                        Some(line) => record_line(&mut tail, line),
                        None => output_open = false,
                    },
                    status = child.wait() => break status,
                }
            }
        })
        .await;

        let (timed_out, exit_code) = match waited {
            Ok(Ok(status)) => {
                log::debug!("Speed test process finished with status: {status}");
                (false, exit_code(status))
            }
            Ok(Err(e)) => {
                log::warn!("Failed to wait for the speed test process: {e}");
                self.kill(child).await;
                (false, UNKNOWN_EXIT_CODE)
            }
            Err(_) => {
                log::warn!("Speed test timed out after {limit:?}, killing the process");
                self.kill(child).await;
                (true, UNKNOWN_EXIT_CODE)
            }
        };

        // Whatever the reader already has. Output held open by a leftover grandchild is not
        // waited for beyond the grace period.
        let _ = timeout(self.config.exit_grace, async {
            while let Some(line) = output.recv().await {
                record_line(&mut tail, line);
            }
        })
        .await;

        ProcessEnd {
            sentinel_seen: false,
            timed_out,
            exit_code,
            tail,
        }
    }

    async fn collect_exit(&self, child: &mut Child) -> i32 {
        match timeout(self.config.exit_grace, child.wait()).await {
            Ok(Ok(status)) => exit_code(status),
            Ok(Err(e)) => {
                log::warn!("Failed to wait for the speed test process: {e}");
                self.kill(child).await;
                UNKNOWN_EXIT_CODE
            }
            Err(_) => {
                log::warn!(
                    "Speed test process did not exit within {:?} of closing its output, killing it",
                    self.config.exit_grace
                );
                self.kill(child).await;
                UNKNOWN_EXIT_CODE
            }
        }
    }

    /// Kill the process and everything it started, then reap it so no zombie is left behind.
    async fn kill(&self, child: &mut Child) {
        if let Some(pid) = child.id() {
            kill_process_group(pid);
        }
        if let Err(e) = child.start_kill() {
            log::debug!("Failed to kill the speed test process, it may have exited already: {e}");
        }
        if let Err(e) = child.wait().await {
            log::warn!("Failed to collect the exit status of the speed test process: {e}");
        }
    }

    /// Whether the newest of the run's log files contains the completion marker.
    fn find_log_marker(&self, new_logs: &[PathBuf]) -> bool {
        let Some(path) = new_logs.first() else {
            log::debug!("No new log file to look for the completion marker in");
            return false;
        };
        match std::fs::read(path) {
            Ok(bytes) => self
                .config
                .log_marker
                .is_present_in(&self.config.decode_policy.decode(&bytes)),
            Err(e) => {
                log::warn!("Failed to read log file '{}': {e}", path.display());
                false
            }
        }
    }
}

fn record_line(tail: &mut TailBuffer, line: String) {
    log::debug!(target: OUTPUT_LOG_TARGET, "{line}");
    tail.push(line);
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(UNKNOWN_EXIT_CODE)
}

/// Read the combined output on its own thread and forward it as decoded lines.
///
/// The thread ends when the output closes or the receiver is dropped.
fn forward_output(output: PipeReader, policy: DecodePolicy) -> Result<Receiver<String>, RunError> {
    let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
    std::thread::Builder::new()
        .name("stairspeed-output".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(output);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(policy.decode_line(&buf)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read output of the speed test process: {e}");
                        break;
                    }
                }
            }
        })
        .map_err(RunError::Output)?;
    Ok(rx)
}

/// Kills what is left of the executable's process group when dropped.
struct ProcessGroupGuard(Option<u32>);

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.0 {
            kill_process_group(pid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) => log::debug!("Killed process group {pgid}"),
        Err(Errno::ESRCH) => log::trace!("Process group {pgid} has already exited"),
        Err(e) => log::warn!("Failed to kill process group {pgid}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
