//! Kafka producer for captured-payment events

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::Record;
use settlement_common::event::{partition_for_key, TOPIC_PARTITIONS, TOPIC_REPLICATION};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::{Error, Result};

/// Per-attempt publish deadline.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// In-call publish attempts before the error surfaces to the outbox loop.
const PUBLISH_ATTEMPTS: u64 = 3;

/// Seam between the outbox relay and the bus client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a payload keyed so all events of one reference share a
    /// partition.
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<()>;
}

/// rskafka-backed publisher with one client per topic partition.
pub struct KafkaProducer {
    partitions: Vec<PartitionClient>,
}

impl KafkaProducer {
    /// Connect to the brokers, create the topic if missing and bind a client
    /// to each partition.
    pub async fn connect(brokers: Vec<String>, topic: &str) -> Result<Self> {
        info!("Connecting Kafka producer to {:?}", brokers);
        let client = ClientBuilder::new(brokers)
            .build()
            .await
            .map_err(|e| Error::Publish(e.to_string()))?;

        let controller = client
            .controller_client()
            .map_err(|e| Error::Publish(e.to_string()))?;
        if let Err(e) = controller
            .create_topic(topic, TOPIC_PARTITIONS, TOPIC_REPLICATION, 5_000)
            .await
        {
            // Usually "topic already exists"; the partition clients below
            // fail loudly if the topic is genuinely absent.
            warn!("create_topic {}: {}", topic, e);
        }

        let mut partitions = Vec::with_capacity(TOPIC_PARTITIONS as usize);
        for partition in 0..TOPIC_PARTITIONS {
            let partition_client = client
                .partition_client(topic.to_owned(), partition, UnknownTopicHandling::Retry)
                .await
                .map_err(|e| Error::Publish(e.to_string()))?;
            partitions.push(partition_client);
        }

        info!("Kafka producer ready on topic {}", topic);
        Ok(Self { partitions })
    }
}

#[async_trait]
impl EventPublisher for KafkaProducer {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<()> {
        let partition = partition_for_key(key, self.partitions.len() as i32);
        let client = &self.partitions[partition as usize];

        let record = Record {
            key: Some(key.as_bytes().to_vec()),
            value: Some(payload.to_vec()),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let mut last_error = String::new();
        for attempt in 1..=PUBLISH_ATTEMPTS {
            let produce = client.produce(vec![record.clone()], Compression::default());
            match tokio::time::timeout(PUBLISH_TIMEOUT, produce).await {
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = "publish attempt timed out".to_string(),
            }
            tokio::time::sleep(Duration::from_millis(200 * attempt)).await;
        }

        Err(Error::Publish(format!(
            "publish failed after {} attempts: {}",
            PUBLISH_ATTEMPTS, last_error
        )))
    }
}
