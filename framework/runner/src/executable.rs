use std::env;
use std::path::{Path, PathBuf};

use anyhow::bail;
use anyhow::Context;

use crate::types::StairSpeedResult;

/// Environment variable to override the path to the speed test executable.
pub const STAIRSPEED_EXE_ENV: &str = "STAIRSPEED_EXE";

/// File name of the speed test executable when it is not configured explicitly.
pub const DEFAULT_EXECUTABLE_NAME: &str = if cfg!(windows) {
    "stairspeedtest.exe"
} else {
    "stairspeedtest"
};

/// Get the path to the speed test executable.
///
/// If the [`STAIRSPEED_EXE_ENV`] environment variable is set, its value is used as the path,
/// resolved against `work_dir` when relative. Otherwise [`DEFAULT_EXECUTABLE_NAME`] is looked up
/// in `work_dir` and then in the user's `PATH`.
pub fn executable_path(work_dir: &Path) -> StairSpeedResult<PathBuf> {
    match env::var(STAIRSPEED_EXE_ENV).ok().as_deref() {
        Some("") => {
            bail!("'{STAIRSPEED_EXE_ENV}' set to empty string");
        }
        Some(path) => {
            let exe_path = work_dir.join(path);
            if !exe_path.exists() {
                bail!(
                    "Path to the speed test executable overwritten with '{STAIRSPEED_EXE_ENV}={path}' but that path doesn't exist",
                    path = exe_path.display()
                );
            }
            Ok(exe_path)
        }
        None => {
            let local = work_dir.join(DEFAULT_EXECUTABLE_NAME);
            if local.exists() {
                return Ok(local);
            }
            log::warn!(
                "'{STAIRSPEED_EXE_ENV}' is not set and '{}' does not exist so looking in user's 'PATH'",
                local.display()
            );
            which::which(DEFAULT_EXECUTABLE_NAME).with_context(|| {
                format!(
                    "Speed test executable not found in '{}' or PATH. Please set '{STAIRSPEED_EXE_ENV}' or pass --exe.",
                    work_dir.display()
                )
            })
        }
    }
}
