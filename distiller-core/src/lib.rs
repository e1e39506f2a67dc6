//! Core library for the Distiller acquisition pipeline.
//!
//! Three cooperating stream workers share this crate: the Scan
//! Reconstructor (file events into durable scan records), the Job
//! Orchestrator (submit events into remote batch jobs plus state
//! reconciliation), and the HAADF Image Worker (DM4 files into uploaded
//! previews). Underneath them sit the broker layer with its
//! changelog-backed tables and the clients for the record store and the
//! Super-Facility API.

pub mod broker;
pub mod error;
pub mod haadf;
pub mod orchestrator;
pub mod providers;
pub mod reconstructor;
#[cfg(test)]
pub(crate) mod test_support;

pub use broker::{KafkaPublisher, Table, TopicPublisher, create_consumer};
pub use error::{CoreError, Result};
pub use haadf::HaadfWorker;
pub use orchestrator::JobOrchestrator;
pub use providers::{HttpRecordStore, RecordStore, SfApi, SfApiClient};
pub use reconstructor::{ReconstructorTables, ScanReconstructor};
