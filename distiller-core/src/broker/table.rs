//! Changelog-backed key/value tables.
//!
//! Each table is an in-memory map whose every mutation is mirrored to a
//! compacted changelog topic (`distiller-<table>-changelog`, keyed by the
//! table key, tombstone on delete). On startup the map is rebuilt by
//! replaying the changelog from the beginning of the partition, so the
//! table survives process restarts without a local store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::TopicPublisher;
use crate::error::Result;

const REPLAY_RECV_TIMEOUT: Duration = Duration::from_secs(10);

pub fn changelog_topic(table: &str) -> String {
    format!("distiller-{table}-changelog")
}

/// A key/value table with Faust-style changelog persistence.
///
/// Readers and writers of a given key must live on the owning partition's
/// consumer; all access here is single-owner by construction.
pub struct Table<V> {
    name: String,
    topic: String,
    entries: BTreeMap<String, V>,
    publisher: Arc<dyn TopicPublisher>,
}

impl<V> std::fmt::Debug for Table<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<V> Table<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    pub fn new(name: &str, publisher: Arc<dyn TopicPublisher>) -> Self {
        Self {
            name: name.to_string(),
            topic: changelog_topic(name),
            entries: BTreeMap::new(),
            publisher,
        }
    }

    /// Rebuild a table by replaying its changelog topic to the current high
    /// watermark. A missing topic yields an empty table.
    pub async fn restore(
        name: &str,
        kafka_url: &str,
        publisher: Arc<dyn TopicPublisher>,
    ) -> Result<Self> {
        let mut table = Self::new(name, publisher);
        let topic = table.topic.clone();

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", kafka_url)
            .set("group.id", format!("distiller-restore-{}", Uuid::new_v4()))
            .set("enable.auto.commit", "false")
            .create()?;

        let (low, high) =
            match consumer.fetch_watermarks(&topic, 0, REPLAY_RECV_TIMEOUT) {
                Ok(watermarks) => watermarks,
                Err(err) => {
                    debug!(table = name, %err, "no changelog to replay");
                    return Ok(table);
                }
            };
        if low >= high {
            return Ok(table);
        }

        let mut assignment = TopicPartitionList::new();
        assignment.add_partition_offset(&topic, 0, Offset::Beginning)?;
        consumer.assign(&assignment)?;

        let mut next = low;
        while next < high {
            let message =
                match tokio::time::timeout(REPLAY_RECV_TIMEOUT, consumer.recv())
                    .await
                {
                    Ok(received) => received?,
                    Err(_) => {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!("changelog replay stalled for table {name}"),
                        )
                        .into());
                    }
                };
            let Some(key) = message.key().map(|k| String::from_utf8_lossy(k)) else {
                warn!(table = name, "changelog record without key, skipping");
                next = message.offset() + 1;
                continue;
            };
            table.restore_entry(&key, message.payload())?;
            next = message.offset() + 1;
        }

        debug!(table = name, entries = table.len(), "table restored");
        Ok(table)
    }

    fn restore_entry(&mut self, key: &str, payload: Option<&[u8]>) -> Result<()> {
        match payload {
            Some(bytes) => {
                let value: V = serde_json::from_slice(bytes)?;
                self.entries.insert(key.to_string(), value);
            }
            None => {
                self.entries.remove(key);
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub async fn put(&mut self, key: &str, value: V) -> Result<()> {
        let payload = serde_json::to_vec(&value)?;
        self.publisher
            .publish(&self.topic, Some(key), Some(payload))
            .await?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub async fn delete(&mut self, key: &str) -> Result<()> {
        self.publisher.publish(&self.topic, Some(key), None).await?;
        self.entries.remove(key);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
