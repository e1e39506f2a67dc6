//! The Scan Reconstructor.
//!
//! Turns the per-file event stream (plus periodic full-directory sync
//! snapshots) into durable scan records. The three changelog-backed tables
//! are the ground truth; the record store is a downstream projection updated
//! with monotone log-file counts.

pub mod paths;
pub mod state;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use distiller_model::{
    FileEventType, FileSystemEvent, ScanCreate, ScanEvent, ScanUpdate, SyncEvent,
};
use rdkafka::Message;
use rdkafka::consumer::StreamConsumer;
use rdkafka::message::BorrowedMessage;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broker::{
    TOPIC_FILE_EVENTS, TOPIC_SCAN_EVENTS, TOPIC_SYNC_EVENTS, TopicPublisher,
    publish_json,
};
use crate::error::{CoreError, Result};
use crate::providers::RecordStore;

pub use paths::{extract_scan_id, is_primary_log};
pub use state::{LogFileState, ReconstructorTables};

pub struct ScanReconstructor {
    store: Arc<dyn RecordStore>,
    publisher: Arc<dyn TopicPublisher>,
    tables: ReconstructorTables,
    log_files_per_scan: i64,
}

impl std::fmt::Debug for ScanReconstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanReconstructor")
            .field("tables", &self.tables)
            .field("log_files_per_scan", &self.log_files_per_scan)
            .finish_non_exhaustive()
    }
}

fn is_override(state: &LogFileState, incoming: DateTime<Utc>) -> bool {
    state.created.is_some_and(|created| created != incoming)
}

impl ScanReconstructor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        publisher: Arc<dyn TopicPublisher>,
        tables: ReconstructorTables,
        log_files_per_scan: i64,
    ) -> Self {
        Self {
            store,
            publisher,
            tables,
            log_files_per_scan,
        }
    }

    /// Consume file and sync events until shutdown. Deterministic failures
    /// are logged and skipped; local I/O and broker failures propagate so
    /// the partition is redelivered on the next start.
    pub async fn run(
        mut self,
        consumer: StreamConsumer,
        shutdown: CancellationToken,
    ) -> Result<()> {
        info!("scan reconstructor started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("scan reconstructor shutting down");
                    return Ok(());
                }
                received = consumer.recv() => {
                    let message = received?;
                    if let Err(err) = self.dispatch(&message).await {
                        match err {
                            CoreError::Io(_) | CoreError::Broker(_) => return Err(err),
                            err => error!(%err, "failed to process event, skipping"),
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&mut self, message: &BorrowedMessage<'_>) -> Result<()> {
        let Some(payload) = message.payload() else {
            return Ok(());
        };
        match message.topic() {
            TOPIC_FILE_EVENTS => {
                let event: FileSystemEvent = serde_json::from_slice(payload)?;
                self.handle_file_event(&event).await
            }
            TOPIC_SYNC_EVENTS => {
                let event: SyncEvent = serde_json::from_slice(payload)?;
                self.handle_sync_event(&event).await
            }
            other => {
                warn!(topic = other, "message on unexpected topic");
                Ok(())
            }
        }
    }

    pub async fn handle_file_event(&mut self, event: &FileSystemEvent) -> Result<()> {
        if event.is_directory || event.event_type == FileEventType::Other {
            return Ok(());
        }
        let path = event.src_path.as_str();

        if event.event_type == FileEventType::Deleted {
            return self.process_delete(path).await;
        }

        let mut state = self
            .tables
            .log_files
            .get(path)
            .cloned()
            .unwrap_or_default();

        // Already handled this exact observation.
        if state.processed && state.created == Some(event.created) {
            return Ok(());
        }

        if is_override(&state, event.created) {
            self.process_override(path).await?;
        }

        state.created = Some(event.created);
        match event.event_type {
            FileEventType::Created | FileEventType::Modified => {
                state.received_created_event = true;
            }
            FileEventType::Closed => {
                state.received_closed_event = true;
            }
            FileEventType::Deleted | FileEventType::Other => {}
        }

        if state.is_ready() {
            self.process_log_file(path, event.created).await?;
            state.processed = true;
        }

        self.tables.log_files.put(path, state).await
    }

    pub async fn handle_sync_event(&mut self, event: &SyncEvent) -> Result<()> {
        // Anything we know about that the watcher no longer sees is gone.
        let snapshot: HashSet<&str> =
            event.files.iter().map(|f| f.path.as_str()).collect();
        let stale: Vec<String> = self
            .tables
            .log_files
            .keys()
            .filter(|path| !snapshot.contains(path.as_str()))
            .cloned()
            .collect();
        for path in stale {
            self.process_delete(&path).await?;
        }

        for file in &event.files {
            let mut state = self
                .tables
                .log_files
                .get(&file.path)
                .cloned()
                .unwrap_or_default();
            if state.processed && state.created == Some(file.created) {
                continue;
            }
            if is_override(&state, file.created) {
                self.process_override(&file.path).await?;
            }

            // A snapshot entry stands in for the whole create/close
            // handshake: fast-forward straight to processed.
            self.process_log_file(&file.path, file.created).await?;
            state.created = Some(file.created);
            state.received_created_event = true;
            state.received_closed_event = true;
            state.processed = true;
            self.tables.log_files.put(&file.path, state).await?;
        }
        Ok(())
    }

    /// Record a processed log file: grow the scan's path set, make sure the
    /// scan exists in the record store when this is the primary log, emit
    /// the observability event, and push the new count downstream.
    async fn process_log_file(
        &mut self,
        path: &str,
        created: DateTime<Utc>,
    ) -> Result<()> {
        let Some(scan_id) = extract_scan_id(path) else {
            warn!(path, "could not extract scan number, skipping");
            return Ok(());
        };
        let key = scan_id.to_string();

        let mut scan_paths = self
            .tables
            .scan_id_to_log_files
            .get(&key)
            .cloned()
            .unwrap_or_default();
        scan_paths.insert(path.to_string());
        let log_files = scan_paths.len() as i64;
        self.tables
            .scan_id_to_log_files
            .put(&key, scan_paths)
            .await?;

        if is_primary_log(path) {
            let scans = self.store.get_scans(scan_id, created).await?;
            let db_id = match scans.len() {
                0 => {
                    let scan = self
                        .store
                        .create_scan(ScanCreate {
                            scan_id,
                            created,
                            log_files,
                            locations: Vec::new(),
                        })
                        .await?;
                    scan.id
                }
                1 => scans[0].id,
                _ => {
                    return Err(CoreError::InvariantViolation(format!(
                        "multiple scans with number {scan_id} created {created}"
                    )));
                }
            };
            self.tables.scan_id_to_id.put(&key, db_id).await?;
        }

        publish_json(
            self.publisher.as_ref(),
            TOPIC_SCAN_EVENTS,
            Some(&key),
            &ScanEvent { scan_id, log_files },
        )
        .await?;

        if let Some(db_id) = self.tables.scan_id_to_id.get(&key).copied() {
            // The store only applies strictly greater counts, so stale
            // redeliveries collapse into no-ops server-side.
            self.store
                .update_scan(db_id, ScanUpdate::log_files(log_files))
                .await?;
        }

        if log_files == self.log_files_per_scan {
            info!("Transfer complete for scan {scan_id}");
        }
        Ok(())
    }

    async fn process_delete(&mut self, path: &str) -> Result<()> {
        let Some(scan_id) = extract_scan_id(path) else {
            warn!(path, "could not extract scan number, skipping delete");
            return Ok(());
        };
        let key = scan_id.to_string();

        self.tables.log_files.delete(path).await?;

        let mut scan_paths = self
            .tables
            .scan_id_to_log_files
            .get(&key)
            .cloned()
            .unwrap_or_default();
        scan_paths.remove(path);

        if scan_paths.is_empty() {
            // The scan itself stays in the record store; only the local
            // reconstruction state is dropped.
            self.tables.scan_id_to_id.delete(&key).await?;
            self.tables.scan_id_to_log_files.delete(&key).await?;
            info!("Scan {scan_id} removed");
        } else {
            self.tables
                .scan_id_to_log_files
                .put(&key, scan_paths)
                .await?;
        }
        Ok(())
    }

    /// The path is being reused for a new acquisition: purge every table
    /// entry belonging to the scan number before the new event is applied.
    async fn process_override(&mut self, path: &str) -> Result<()> {
        let Some(scan_id) = extract_scan_id(path) else {
            return Ok(());
        };
        let key = scan_id.to_string();
        info!("Scan {scan_id} overridden, purging state");

        self.tables.scan_id_to_id.delete(&key).await?;
        self.tables.scan_id_to_log_files.delete(&key).await?;

        let same_scan: Vec<String> = self
            .tables
            .log_files
            .keys()
            .filter(|p| extract_scan_id(p) == Some(scan_id))
            .cloned()
            .collect();
        for p in same_scan {
            self.tables.log_files.delete(&p).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn tables(&self) -> &ReconstructorTables {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::testing::MemoryPublisher;
    use crate::providers::MockRecordStore;
    use chrono::TimeZone;
    use distiller_model::{Scan, SyncedFile};
    use mockall::predicate::eq;

    const PRIMARY: &str = "/data/log_0001_primary.data";

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, minute, 5).unwrap()
    }

    fn stored_scan(id: i64, scan_id: i64, created: DateTime<Utc>) -> Scan {
        Scan {
            id,
            scan_id,
            created,
            log_files: 0,
            haadf_path: None,
            notes: None,
            locations: Vec::new(),
        }
    }

    fn file_event(
        event_type: FileEventType,
        path: &str,
        created: DateTime<Utc>,
    ) -> FileSystemEvent {
        FileSystemEvent {
            event_type,
            src_path: path.to_string(),
            is_directory: false,
            created,
        }
    }

    fn reconstructor(
        store: MockRecordStore,
        publisher: Arc<MemoryPublisher>,
        threshold: i64,
    ) -> ScanReconstructor {
        ScanReconstructor::new(
            Arc::new(store),
            publisher.clone(),
            ReconstructorTables::new(publisher),
            threshold,
        )
    }

    async fn scan_events(publisher: &MemoryPublisher) -> Vec<ScanEvent> {
        publisher
            .on_topic(TOPIC_SCAN_EVENTS)
            .await
            .iter()
            .map(|record| {
                serde_json::from_slice(record.payload.as_deref().unwrap()).unwrap()
            })
            .collect()
    }

    // S1: create + close of the primary log file creates the scan, emits one
    // observability event, and leaves the path fully processed.
    #[tokio::test]
    async fn happy_path_single_scan() {
        let created = ts(4);
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .with(eq(1), eq(created))
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create_scan()
            .withf(move |create| {
                create.scan_id == 1
                    && create.created == created
                    && create.log_files == 1
            })
            .times(1)
            .returning(move |create| {
                Ok(stored_scan(10, create.scan_id, create.created))
            });
        store
            .expect_update_scan()
            .with(eq(10), eq(ScanUpdate::log_files(1)))
            .times(1)
            .returning(move |_, _| Ok(stored_scan(10, 1, created)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, created))
            .await
            .unwrap();
        worker
            .handle_file_event(&file_event(FileEventType::Closed, PRIMARY, created))
            .await
            .unwrap();

        let events = scan_events(&publisher).await;
        assert_eq!(events, vec![ScanEvent { scan_id: 1, log_files: 1 }]);

        let state = worker.tables().log_files.get(PRIMARY).unwrap();
        assert!(state.processed);
        assert!(state.is_ready());
        assert_eq!(worker.tables().scan_id_to_id.get("1"), Some(&10));
    }

    // P3: close-then-create produces the same post-state as create-then-close.
    #[tokio::test]
    async fn event_order_does_not_matter() {
        let created = ts(4);
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create_scan()
            .times(1)
            .returning(move |create| {
                Ok(stored_scan(10, create.scan_id, create.created))
            });
        store
            .expect_update_scan()
            .times(1)
            .returning(move |_, _| Ok(stored_scan(10, 1, created)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        worker
            .handle_file_event(&file_event(FileEventType::Closed, PRIMARY, created))
            .await
            .unwrap();
        // Close alone is not enough.
        assert!(scan_events(&publisher).await.is_empty());

        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, created))
            .await
            .unwrap();
        assert_eq!(scan_events(&publisher).await.len(), 1);
        assert!(worker.tables().log_files.get(PRIMARY).unwrap().processed);
    }

    // P2: replaying an already-processed event is a no-op.
    #[tokio::test]
    async fn replayed_event_is_idempotent() {
        let created = ts(4);
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create_scan()
            .times(1)
            .returning(move |create| {
                Ok(stored_scan(10, create.scan_id, create.created))
            });
        store
            .expect_update_scan()
            .times(1)
            .returning(move |_, _| Ok(stored_scan(10, 1, created)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        for event_type in [
            FileEventType::Created,
            FileEventType::Created,
            FileEventType::Closed,
            FileEventType::Closed,
            FileEventType::Created,
        ] {
            worker
                .handle_file_event(&file_event(event_type, PRIMARY, created))
                .await
                .unwrap();
        }

        assert_eq!(scan_events(&publisher).await.len(), 1);
        assert_eq!(
            worker.tables().scan_id_to_log_files.get("1").unwrap().len(),
            1
        );
    }

    // P4: the primary log of an already-stored scan is reused, not recreated.
    #[tokio::test]
    async fn existing_scan_is_reused() {
        let created = ts(4);
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .times(1)
            .returning(move |_, _| Ok(vec![stored_scan(33, 1, created)]));
        store
            .expect_update_scan()
            .with(eq(33), eq(ScanUpdate::log_files(1)))
            .times(1)
            .returning(move |_, _| Ok(stored_scan(33, 1, created)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, created))
            .await
            .unwrap();
        worker
            .handle_file_event(&file_event(FileEventType::Closed, PRIMARY, created))
            .await
            .unwrap();

        assert_eq!(worker.tables().scan_id_to_id.get("1"), Some(&33));
    }

    // Multiple scans for one (number, timestamp) is an invariant violation:
    // the event fails, the worker carries on.
    #[tokio::test]
    async fn duplicate_scans_fail_the_event() {
        let created = ts(4);
        let mut store = MockRecordStore::new();
        store.expect_get_scans().returning(move |_, _| {
            Ok(vec![stored_scan(1, 1, created), stored_scan(2, 1, created)])
        });

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, created))
            .await
            .unwrap();
        let err = worker
            .handle_file_event(&file_event(FileEventType::Closed, PRIMARY, created))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation(_)));

        // Not marked processed: a redelivery gets another chance.
        assert!(!worker.tables().log_files.get(PRIMARY).unwrap().processed);
    }

    // S2: same timestamp again is silent; a new timestamp purges scan state
    // and re-creates the scan.
    #[tokio::test]
    async fn override_purges_and_recreates() {
        let first = ts(4);
        let second = ts(5);
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .times(2)
            .returning(|_, _| Ok(Vec::new()));
        let mut next_id = 10;
        store.expect_create_scan().times(2).returning(move |create| {
            next_id += 1;
            Ok(stored_scan(next_id, create.scan_id, create.created))
        });
        store
            .expect_update_scan()
            .times(2)
            .returning(move |id, _| Ok(stored_scan(id, 1, first)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, first))
            .await
            .unwrap();
        worker
            .handle_file_event(&file_event(FileEventType::Closed, PRIMARY, first))
            .await
            .unwrap();

        // Identical timestamp: no further side effects.
        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, first))
            .await
            .unwrap();
        assert_eq!(scan_events(&publisher).await.len(), 1);

        // New timestamp: override.
        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, second))
            .await
            .unwrap();

        assert_eq!(scan_events(&publisher).await.len(), 2);
        assert_eq!(worker.tables().scan_id_to_id.get("1"), Some(&12));
        let state = worker.tables().log_files.get(PRIMARY).unwrap();
        assert_eq!(state.created, Some(second));
        assert!(state.processed);
    }

    // S3 / P1 / P5: seventy-two distinct log files complete the scan, and the
    // count pushed downstream tracks the path-set size monotonically.
    #[tokio::test]
    async fn completion_threshold() {
        let created = ts(4);
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create_scan()
            .times(1)
            .returning(move |create| {
                Ok(stored_scan(7, create.scan_id, create.created))
            });
        store
            .expect_update_scan()
            .withf(|id, update| *id == 7 && update.log_files.is_some())
            .times(72)
            .returning(move |_, _| Ok(stored_scan(7, 42, created)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        let mut paths = vec!["/data/log_42_primary.data".to_string()];
        for module in 1..72 {
            paths.push(format!("/data/log_42_module{module}.data"));
        }
        for path in &paths {
            worker
                .handle_file_event(&file_event(FileEventType::Created, path, created))
                .await
                .unwrap();
            worker
                .handle_file_event(&file_event(FileEventType::Closed, path, created))
                .await
                .unwrap();
        }

        let events = scan_events(&publisher).await;
        assert_eq!(events.len(), 72);
        let counts: Vec<i64> = events.iter().map(|e| e.log_files).collect();
        assert!(counts.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(counts.last(), Some(&72));
        assert_eq!(
            worker.tables().scan_id_to_log_files.get("42").unwrap().len(),
            72
        );
    }

    // P6: deleting the last path clears both auxiliary tables but never
    // deletes the scan from the record store (the mock has no expectation
    // for it, so any call would fail the test).
    #[tokio::test]
    async fn delete_of_last_path_clears_tables() {
        let created = ts(4);
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create_scan()
            .times(1)
            .returning(move |create| {
                Ok(stored_scan(10, create.scan_id, create.created))
            });
        store
            .expect_update_scan()
            .times(1)
            .returning(move |_, _| Ok(stored_scan(10, 1, created)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        worker
            .handle_file_event(&file_event(FileEventType::Created, PRIMARY, created))
            .await
            .unwrap();
        worker
            .handle_file_event(&file_event(FileEventType::Closed, PRIMARY, created))
            .await
            .unwrap();
        worker
            .handle_file_event(&file_event(FileEventType::Deleted, PRIMARY, created))
            .await
            .unwrap();

        assert!(worker.tables().log_files.is_empty());
        assert!(worker.tables().scan_id_to_id.is_empty());
        assert!(worker.tables().scan_id_to_log_files.is_empty());
    }

    // S4: a sync snapshot deletes what disappeared, processes what is new,
    // and leaves already-processed entries alone.
    #[tokio::test]
    async fn sync_event_reconciles_snapshot() {
        let created = ts(4);
        let paths = [
            "/data/log_5_primary.data",
            "/data/log_5_module1.data",
            "/data/log_5_module2.data",
        ];
        let mut store = MockRecordStore::new();
        store
            .expect_get_scans()
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        store
            .expect_create_scan()
            .times(1)
            .returning(move |create| {
                Ok(stored_scan(50, create.scan_id, create.created))
            });
        // Three updates while seeding, one for the new path from the sync.
        store
            .expect_update_scan()
            .times(4)
            .returning(move |_, _| Ok(stored_scan(50, 5, created)));

        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        for path in paths {
            worker
                .handle_file_event(&file_event(FileEventType::Created, path, created))
                .await
                .unwrap();
            worker
                .handle_file_event(&file_event(FileEventType::Closed, path, created))
                .await
                .unwrap();
        }

        // Snapshot: primary gone, module1/module2 unchanged, module3 new.
        let sync = SyncEvent {
            files: vec![
                SyncedFile {
                    path: "/data/log_5_module1.data".to_string(),
                    created,
                },
                SyncedFile {
                    path: "/data/log_5_module2.data".to_string(),
                    created,
                },
                SyncedFile {
                    path: "/data/log_5_module3.data".to_string(),
                    created,
                },
            ],
        };
        worker.handle_sync_event(&sync).await.unwrap();

        assert!(worker.tables().log_files.get(paths[0]).is_none());
        let set = worker.tables().scan_id_to_log_files.get("5").unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains("/data/log_5_module3.data"));
        assert!(!set.contains(paths[0]));

        // P1: the last pushed count matches the set size.
        let events = scan_events(&publisher).await;
        assert_eq!(events.last().unwrap().log_files, 3);
    }

    // Paths the parser cannot attribute to a scan are skipped with a warning
    // rather than failing the partition.
    #[tokio::test]
    async fn unparseable_path_is_skipped() {
        let created = ts(4);
        let store = MockRecordStore::new();
        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        worker
            .handle_file_event(&file_event(
                FileEventType::Created,
                "/data/notes.txt",
                created,
            ))
            .await
            .unwrap();
        worker
            .handle_file_event(&file_event(
                FileEventType::Closed,
                "/data/notes.txt",
                created,
            ))
            .await
            .unwrap();

        assert!(scan_events(&publisher).await.is_empty());
        assert!(worker.tables().scan_id_to_log_files.is_empty());
    }

    // Directory events and unknown event types are ignored outright.
    #[tokio::test]
    async fn irrelevant_events_are_ignored() {
        let created = ts(4);
        let store = MockRecordStore::new();
        let publisher = Arc::new(MemoryPublisher::default());
        let mut worker = reconstructor(store, publisher.clone(), 72);

        let mut dir_event = file_event(FileEventType::Created, "/data", created);
        dir_event.is_directory = true;
        worker.handle_file_event(&dir_event).await.unwrap();
        worker
            .handle_file_event(&file_event(FileEventType::Other, PRIMARY, created))
            .await
            .unwrap();

        assert!(worker.tables().log_files.is_empty());
    }
}
