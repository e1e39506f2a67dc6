//! Filename parsing for detector log files.
//!
//! The detector writes every log file for scan `N` with a `log_N` filename
//! stem; the primary log file (the one whose creation timestamp defines the
//! scan's `created` time) carries a `_primary` marker.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static SCAN_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"log_(\d+)").unwrap());
static PRIMARY_LOG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^log_\d+_primary\.\w+$").unwrap());

/// Extract the scan number from a log file path. Returns `None` for paths
/// that do not look like detector log files.
pub fn extract_scan_id(path: &str) -> Option<i64> {
    let filename = Path::new(path).file_name()?.to_str()?;
    let captures = SCAN_ID_RE.captures(filename)?;
    captures[1].parse().ok()
}

/// Whether the path is the scan's primary log file.
pub fn is_primary_log(path: &str) -> bool {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| PRIMARY_LOG_RE.is_match(name))
}
