#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use stairspeed_runner::prelude::RunnerConfig;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tempfile::TempDir;

pub const FAKE_EXE: &str = "fake-stairspeedtest.sh";

/// A work directory with a shell script standing in for the speed test executable.
pub fn fake_work_dir(script: &str) -> (TempDir, RunnerConfig) {
    let dir = TempDir::new().expect("failed to create temp dir");
    std::fs::write(dir.path().join(FAKE_EXE), script).expect("failed to write fake executable");

    let config = RunnerConfig::new(dir.path())
        .with_launcher("sh")
        .with_executable(FAKE_EXE)
        .with_poll_interval(Duration::from_millis(10))
        .with_exit_grace(Duration::from_secs(2));
    (dir, config)
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Whether a process is still running. Zombies count as gone, an orphan may wait a while for its
/// new parent to reap it.
pub fn process_exists(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid)
        .is_some_and(|process| process.status() != ProcessStatus::Zombie)
}

/// Wait up to a second for a killed process to disappear.
pub fn process_gone(pid: u32) -> bool {
    for _ in 0..20 {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Read the pid a test script wrote with `echo $! > <name>`.
pub fn read_pid(path: &Path) -> u32 {
    std::fs::read_to_string(path)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}
