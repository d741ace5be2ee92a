use indicatif::{ProgressBar, ProgressStyle};

/// A progress bar over the targets of a batch, showing the target currently running.
///
/// Returns a hidden bar when `show` is false so callers can update it unconditionally.
pub fn start_progress(targets: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(targets as u64);
    match ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::debug!("Using the default progress style: {e}"),
    }
    pb
}
