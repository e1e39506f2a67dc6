//! Per-path reconstruction state and the tables that back it.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::{Table, TopicPublisher};
use crate::error::Result;

/// Where a single log file is in its lifecycle. The implicit default (all
/// false) is the empty state; a path is processed exactly once, after both
/// the create and the close have been observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFileState {
    pub received_created_event: bool,
    pub received_closed_event: bool,
    pub created: Option<DateTime<Utc>>,
    pub processed: bool,
}

impl LogFileState {
    /// Both halves of the create/close handshake observed.
    pub fn is_ready(&self) -> bool {
        self.received_created_event && self.received_closed_event
    }
}

/// The reconstructor's ground-truth local state. Record-store writes are
/// downstream projections of these tables and may temporarily lag.
pub struct ReconstructorTables {
    /// path -> log file state
    pub log_files: Table<LogFileState>,
    /// scan number -> record-store surrogate id
    pub scan_id_to_id: Table<i64>,
    /// scan number -> paths of processed log files
    pub scan_id_to_log_files: Table<BTreeSet<String>>,
}

impl std::fmt::Debug for ReconstructorTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconstructorTables")
            .field("log_files", &self.log_files.len())
            .field("scan_id_to_id", &self.scan_id_to_id.len())
            .field("scan_id_to_log_files", &self.scan_id_to_log_files.len())
            .finish()
    }
}

impl ReconstructorTables {
    pub fn new(publisher: Arc<dyn TopicPublisher>) -> Self {
        Self {
            log_files: Table::new("log-files", publisher.clone()),
            scan_id_to_id: Table::new("scan-id-to-id", publisher.clone()),
            scan_id_to_log_files: Table::new("scan-id-to-log-files", publisher),
        }
    }

    /// Rebuild all three tables from their changelog topics.
    pub async fn restore(
        kafka_url: &str,
        publisher: Arc<dyn TopicPublisher>,
    ) -> Result<Self> {
        Ok(Self {
            log_files: Table::restore("log-files", kafka_url, publisher.clone())
                .await?,
            scan_id_to_id: Table::restore(
                "scan-id-to-id",
                kafka_url,
                publisher.clone(),
            )
            .await?,
            scan_id_to_log_files: Table::restore(
                "scan-id-to-log-files",
                kafka_url,
                publisher,
            )
            .await?,
        })
    }
}
