//! Event-driven settlement projection
//!
//! One background loop per instance walks every partition of the topic,
//! fetching from the durably stored offset. Undecodable messages are logged
//! and skipped so they never block the partition behind them.

use rskafka::client::partition::{PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::RecordAndOffset;
use settlement_common::event::TOPIC_PARTITIONS;
use settlement_common::PaymentCapturedEvent;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{Error, Result, SettlementStore};

/// Upper bound on bytes fetched per partition per poll.
const FETCH_MAX_BYTES: i32 = 1_048_576;

/// How long a fetch waits for new records before returning empty.
const FETCH_MAX_WAIT_MS: i32 = 500;

pub struct SettlementConsumer {
    store: SettlementStore,
    partitions: Vec<PartitionClient>,
    topic: String,
}

impl SettlementConsumer {
    /// Connect to the brokers and bind a client to each topic partition.
    pub async fn connect(
        brokers: Vec<String>,
        topic: String,
        store: SettlementStore,
    ) -> Result<Self> {
        info!("Connecting settlement consumer to {:?}", brokers);
        let client = ClientBuilder::new(brokers)
            .build()
            .await
            .map_err(|e| Error::Bus(e.to_string()))?;

        let mut partitions = Vec::with_capacity(TOPIC_PARTITIONS as usize);
        for partition in 0..TOPIC_PARTITIONS {
            let partition_client = client
                .partition_client(topic.clone(), partition, UnknownTopicHandling::Retry)
                .await
                .map_err(|e| Error::Bus(e.to_string()))?;
            partitions.push(partition_client);
        }

        info!("Settlement consumer ready on topic {}", topic);
        Ok(Self {
            store,
            partitions,
            topic,
        })
    }

    /// Consume until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Settlement consumer started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Settlement consumer stopped");
                    return;
                }
                result = self.poll_once() => {
                    if let Err(e) = result {
                        error!("consumer poll failed: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }

    /// One sweep over all partitions from their stored offsets.
    async fn poll_once(&self) -> Result<()> {
        for (index, client) in self.partitions.iter().enumerate() {
            let partition = index as i32;
            let offset = self.store.next_offset(&self.topic, partition).await?;

            let (records, _high_watermark) = client
                .fetch_records(offset, 1..FETCH_MAX_BYTES, FETCH_MAX_WAIT_MS)
                .await
                .map_err(|e| Error::Bus(e.to_string()))?;

            for record in records {
                self.handle_record(partition, record).await?;
            }
        }
        Ok(())
    }

    async fn handle_record(&self, partition: i32, record: RecordAndOffset) -> Result<()> {
        // The offset stored is the next one to fetch.
        let next_offset = record.offset + 1;

        let decoded = record
            .record
            .value
            .as_deref()
            .map(serde_json::from_slice::<PaymentCapturedEvent>);

        match decoded {
            Some(Ok(event)) => {
                self.store
                    .apply_event(&self.topic, partition, next_offset, &event)
                    .await
            }
            _ => {
                warn!(
                    partition,
                    offset = record.offset,
                    "undecodable message, skipping"
                );
                self.store
                    .commit_offset(&self.topic, partition, next_offset)
                    .await
            }
        }
    }
}
