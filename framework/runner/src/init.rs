use crate::cli::StairSpeedCli;
use clap::Parser;

/// Initialise the CLI and logging for the batch runner.
pub fn init() -> StairSpeedCli {
    env_logger::init();

    StairSpeedCli::parse()
}
