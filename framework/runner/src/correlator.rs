//! Works out which files in the logs and results directories a run created.
//!
//! Log and result files are named after the time they were opened, and the executable opens them
//! at different moments, so their names can't be paired. Instead each directory is snapshotted
//! before the run and diffed afterwards, and the newest new result file is taken as the run's
//! result.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::{DirEntry, WalkDir};

/// Extension of the files the executable writes to both directories.
const OUTPUT_EXTENSION: &str = "log";

/// Basenames of the output files present in a directory at one moment.
pub type DirSnapshot = HashSet<String>;

/// Take a [`DirSnapshot`] of `dir`. A missing directory gives an empty snapshot.
pub fn snapshot(dir: &Path) -> DirSnapshot {
    output_files(dir).map(|entry| file_name(&entry)).collect()
}

/// The output files in `dir` that are not in `before`, newest first.
///
/// Files with the same modification time are ordered by name, highest first, which keeps the
/// order stable for timestamp-named files.
pub fn new_files(before: &DirSnapshot, dir: &Path) -> Vec<PathBuf> {
    let mut created = output_files(dir)
        .filter(|entry| !before.contains(&file_name(entry)))
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, file_name(&entry), entry.into_path())
        })
        .collect::<Vec<_>>();

    created.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    created.into_iter().map(|(_, _, path)| path).collect()
}

/// Pick the result file for a run: the newest of the new result files, if any.
pub fn select_result(new_results: &[PathBuf]) -> Option<PathBuf> {
    new_results.first().cloned()
}

/// Regular `*.log` files directly inside `dir`, skipping hidden ones like a shell glob would.
fn output_files(dir: &Path) -> impl Iterator<Item = DirEntry> + '_ {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::trace!("Skipping unreadable entry in '{}': {e}", dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_output_file(entry))
}

fn is_output_file(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    !name.starts_with('.')
        && entry
            .path()
            .extension()
            .is_some_and(|ext| ext == OUTPUT_EXTENSION)
}

fn file_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().into_owned()
}
