use std::path::{Path, PathBuf};

use stairspeed_core::prelude::DecodePolicy;

const ORIGINAL_URLS_EXTENSION: &str = "originalUrl.txt";

/// The path of the share link list written next to a result file, `<stem>.originalUrl.txt`.
pub fn original_urls_path(result_path: &Path) -> PathBuf {
    result_path.with_extension(ORIGINAL_URLS_EXTENSION)
}

/// Read the original share links of the nodes in a result file.
///
/// The executable only writes this file when at least one valid node came from a share link, so a
/// missing file yields an empty list.
pub fn load_original_urls(result_path: &Path, policy: DecodePolicy) -> Vec<String> {
    let path = original_urls_path(result_path);
    match std::fs::read(&path) {
        Ok(bytes) => policy
            .decode(&bytes)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            log::warn!("Failed to read share links '{}': {e}", path.display());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_derive_sidecar_path() {
        assert_eq!(
            original_urls_path(Path::new("results/20261019-101500.log")),
            PathBuf::from("results/20261019-101500.originalUrl.txt")
        );
    }

    #[test]
    fn test_should_load_share_links() {
        let dir = tempfile::tempdir().unwrap();
        let result = dir.path().join("20261019-101500.log");
        std::fs::write(
            dir.path().join("20261019-101500.originalUrl.txt"),
            "vless://a@1.2.3.4:443\r\n\nss://b@5.6.7.8:8388\n",
        )
        .unwrap();

        assert_eq!(
            load_original_urls(&result, DecodePolicy::Replace),
            vec!["vless://a@1.2.3.4:443", "ss://b@5.6.7.8:8388"]
        );
    }

    #[test]
    fn test_should_load_nothing_without_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let result = dir.path().join("20261019-101500.log");
        assert!(load_original_urls(&result, DecodePolicy::Replace).is_empty());
    }
}
