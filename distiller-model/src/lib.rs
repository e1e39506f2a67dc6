//! Core data model definitions shared across Distiller crates.
#![allow(missing_docs)]

pub mod error;
pub mod events;
pub mod job;
pub mod machine;
pub mod scan;
pub mod slurm;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use events::{
    FileEventType, FileSystemEvent, HaadfEvent, ScanEvent, SubmitJobEvent,
    SyncEvent, SyncedFile,
};
pub use job::{Job, JobType, JobUpdate, ParamValue, SfapiJob};
pub use machine::Machine;
pub use scan::{Location, Scan, ScanCreate, ScanUpdate};
pub use slurm::{SLURM_RUNNING_STATES, is_running_state, normalize_state};
