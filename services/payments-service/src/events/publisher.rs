//! Outbox polling relay
//!
//! Drains committed outbox rows to the bus. The fetch and the status updates
//! share one transaction with skip-locked row locks, so concurrent publisher
//! instances never fight over the same rows and a crash mid-batch leaves
//! everything PENDING for the next pass. Delivery is at-least-once;
//! consumers dedupe by reference id.

use deadpool_postgres::Pool;
use rand::Rng;
use settlement_common::PaymentCapturedEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::repository::models::OutboxEvent;
use crate::repository::outbox::{self, MAX_RETRIES};
use crate::events::EventPublisher;
use crate::Result;

/// What the relay does with a fetched row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboxAction {
    /// Publish with this partition key.
    Publish(String),
    /// Park the row as FAILED: retries exhausted or payload undecodable.
    Park,
}

/// Decide the fate of one outbox row.
///
/// Undecodable payloads are parked immediately so corruption never blocks
/// the queue behind it.
pub fn next_action(event: &OutboxEvent) -> OutboxAction {
    if event.retry_count >= MAX_RETRIES {
        return OutboxAction::Park;
    }
    match serde_json::from_slice::<PaymentCapturedEvent>(&event.payload) {
        Ok(payload) => OutboxAction::Publish(payload.reference_id),
        Err(_) => OutboxAction::Park,
    }
}

pub struct OutboxPublisher {
    pool: Pool,
    producer: Arc<dyn EventPublisher>,
    poll_interval: Duration,
}

impl OutboxPublisher {
    pub fn new(pool: Pool, producer: Arc<dyn EventPublisher>, poll_interval: Duration) -> Self {
        Self {
            pool,
            producer,
            poll_interval,
        }
    }

    /// Poll until shutdown. Each pass sleeps the configured interval plus
    /// up to one second of jitter so multiple replicas do not lock-step.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Outbox publisher started");
        loop {
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..1000));
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval + jitter) => {
                    if let Err(e) = self.process_batch().await {
                        error!("outbox batch failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("Outbox publisher stopped");
                    return;
                }
            }
        }
    }

    /// One publisher pass: fetch, publish, update statuses, commit.
    pub async fn process_batch(&self) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let events = outbox::fetch_pending(&tx).await?;
        if events.is_empty() {
            return Ok(());
        }

        for event in &events {
            match next_action(event) {
                OutboxAction::Park => {
                    warn!(outbox_id = event.id, "parking outbox row as FAILED");
                    outbox::mark_failed(&tx, event.id).await?;
                }
                OutboxAction::Publish(key) => {
                    match self.producer.publish(&key, &event.payload).await {
                        Ok(()) => {
                            info!(outbox_id = event.id, reference_id = %key, "event published");
                            outbox::mark_published(&tx, event.id).await?;
                        }
                        Err(e) => {
                            warn!(outbox_id = event.id, "publish failed, will retry: {}", e);
                            outbox::increment_retry(&tx, event.id).await?;
                        }
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use settlement_common::Amount;

    fn outbox_event(retry_count: i32, payload: Vec<u8>) -> OutboxEvent {
        OutboxEvent {
            id: 1,
            event_type: "PAYMENT_CAPTURED".to_string(),
            payload,
            retry_count,
            created_at: Utc::now(),
        }
    }

    fn valid_payload() -> Vec<u8> {
        serde_json::to_vec(&PaymentCapturedEvent {
            reference_id: "abcd1234abcd1234".to_string(),
            payer_id: "payer".to_string(),
            payee_id: "payee".to_string(),
            amount: Amount::from_minor_units(100),
            timestamp: 1_700_000_000,
        })
        .unwrap()
    }

    #[test]
    fn test_fresh_event_is_published_with_reference_key() {
        let event = outbox_event(0, valid_payload());
        assert_eq!(
            next_action(&event),
            OutboxAction::Publish("abcd1234abcd1234".to_string())
        );
    }

    #[test]
    fn test_exhausted_retries_park_the_row() {
        let event = outbox_event(MAX_RETRIES, valid_payload());
        assert_eq!(next_action(&event), OutboxAction::Park);
    }

    #[test]
    fn test_corrupt_payload_parks_the_row() {
        let event = outbox_event(0, b"not json".to_vec());
        assert_eq!(next_action(&event), OutboxAction::Park);
    }

    #[test]
    fn test_below_limit_still_publishes() {
        let event = outbox_event(MAX_RETRIES - 1, valid_payload());
        assert!(matches!(next_action(&event), OutboxAction::Publish(_)));
    }
}
