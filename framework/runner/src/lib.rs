mod batch;
mod cli;
mod config;
mod correlator;
mod driver;
mod executable;
mod init;
mod outcome;
mod progress;
mod run;
mod types;

pub mod prelude {
    pub use crate::batch::{read_targets, run_batch, BatchReport, RunReport, TargetReport};
    pub use crate::cli::StairSpeedCli;
    pub use crate::config::{CompletionStrategy, RunnerConfig, DEFAULT_TAIL_LINES, DEFAULT_TIMEOUT};
    pub use crate::correlator::{new_files, select_result, snapshot, DirSnapshot};
    pub use crate::driver::{RunDriver, RunError, OUTPUT_LOG_TARGET};
    pub use crate::executable::{executable_path, DEFAULT_EXECUTABLE_NAME, STAIRSPEED_EXE_ENV};
    pub use crate::init::init;
    pub use crate::outcome::{RunOutcome, RunRequest, UNKNOWN_EXIT_CODE};
    pub use crate::run::run;
    pub use crate::types::StairSpeedResult;

    pub use stairspeed_core::prelude::*;
}
