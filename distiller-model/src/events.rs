//! Topic payloads. All topics carry JSON-encoded records; timestamps are
//! RFC-3339.

use chrono::{DateTime, Utc};

use crate::job::Job;
use crate::scan::Scan;

/// Event types the reconstructor cares about. The watcher emits more kinds
/// than these; anything else deserializes to `Other` and is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FileEventType {
    Created,
    Modified,
    Closed,
    Deleted,
    #[cfg_attr(feature = "serde", serde(other))]
    Other,
}

/// A single filesystem event observed by the acquisition watcher.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileSystemEvent {
    pub event_type: FileEventType,
    pub src_path: String,
    pub is_directory: bool,
    pub created: DateTime<Utc>,
}

/// One entry of a periodic full-directory snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncedFile {
    pub path: String,
    pub created: DateTime<Utc>,
}

/// Periodic full snapshot of every log file the watcher currently sees.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncEvent {
    pub files: Vec<SyncedFile>,
}

/// Observability record emitted after each processed log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanEvent {
    pub scan_id: i64,
    pub log_files: i64,
}

/// Request to submit a batch job for a scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubmitJobEvent {
    pub job: Job,
    pub scan: Scan,
}

/// A HAADF data file ready for preview rendering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HaadfEvent {
    pub path: String,
    pub scan_id: i64,
}
