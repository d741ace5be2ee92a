use anyhow::Context;

use crate::batch::{run_batch, BatchReport};
use crate::cli::StairSpeedCli;
use crate::driver::RunDriver;

/// Run a batch from parsed command line options.
pub fn run(cli: StairSpeedCli) -> anyhow::Result<BatchReport> {
    let show_progress = !cli.no_progress;
    let config = cli.into_config()?;

    log::info!(
        "Testing with '{}' in '{}'",
        config.executable.display(),
        config.work_dir.display()
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let driver = RunDriver::new(config);
    let report = runtime.block_on(run_batch(&driver, show_progress))?;

    Ok(report)
}
