//! Thin wrappers over the Kafka client: topic constants, JSON publishing,
//! consumer construction, and the changelog-backed key/value tables.

pub mod table;

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;

use crate::error::Result;

pub use table::Table;

pub const TOPIC_FILE_EVENTS: &str = "file-events";
pub const TOPIC_SYNC_EVENTS: &str = "sync-events";
pub const TOPIC_SCAN_EVENTS: &str = "scan-events";
pub const TOPIC_SUBMIT_JOB_EVENTS: &str = "submit-job-events";
pub const TOPIC_HAADF_FILE_EVENTS: &str = "haadf-file-events";

/// Consumer group shared by all workers of one deployment.
pub const CONSUMER_GROUP: &str = "distiller";

const PRODUCER_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Seam for everything the workers write to the broker: observability
/// events and table changelog records. A `None` payload is a tombstone.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: Option<Vec<u8>>,
    ) -> Result<()>;
}

/// Serialize `value` as JSON and publish it.
pub async fn publish_json<T: Serialize>(
    publisher: &dyn TopicPublisher,
    topic: &str,
    key: Option<&str>,
    value: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    publisher.publish(topic, key, Some(payload)).await
}

/// Production publisher backed by an rdkafka `FutureProducer`.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl std::fmt::Debug for KafkaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaPublisher").finish_non_exhaustive()
    }
}

impl KafkaPublisher {
    pub fn new(kafka_url: &str) -> Result<Self> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", kafka_url)
            .set("message.timeout.ms", "10000")
            .create()?;
        Ok(Self { producer })
    }
}

#[async_trait]
impl TopicPublisher for KafkaPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: Option<Vec<u8>>,
    ) -> Result<()> {
        let mut record = FutureRecord::<str, Vec<u8>>::to(topic);
        if let Some(key) = key {
            record = record.key(key);
        }
        if let Some(payload) = &payload {
            record = record.payload(payload);
        }
        self.producer
            .send(record, PRODUCER_SEND_TIMEOUT)
            .await
            .map_err(|(err, _)| err)?;
        Ok(())
    }
}

/// Build a stream consumer subscribed to `topics`.
///
/// Offsets are committed automatically once stored; combined with the
/// serial handling loop this gives at-least-once delivery.
pub fn create_consumer(kafka_url: &str, topics: &[&str]) -> Result<StreamConsumer> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", kafka_url)
        .set("group.id", CONSUMER_GROUP)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()?;
    consumer.subscribe(topics)?;
    Ok(consumer)
}
