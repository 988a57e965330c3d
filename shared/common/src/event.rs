//! Captured-payment event payload and partition keying

use crate::money::Amount;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Event type written to the outbox when a payment is captured.
pub const EVENT_PAYMENT_CAPTURED: &str = "PAYMENT_CAPTURED";

/// Number of partitions on the payment events topic.
pub const TOPIC_PARTITIONS: i32 = 3;

/// Replication factor for the payment events topic (dev default).
pub const TOPIC_REPLICATION: i16 = 1;

/// Payload published to the bus for every captured payment.
///
/// The timestamp is Unix seconds at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCapturedEvent {
    pub reference_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: Amount,
    pub timestamp: i64,
}

/// Partition for a message key.
///
/// All events for one reference id must land on the same partition so their
/// relative order survives the bus.
pub fn partition_for_key(key: &str, partitions: i32) -> i32 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let event = PaymentCapturedEvent {
            reference_id: "abcd1234abcd1234".to_string(),
            payer_id: "payer-1".to_string(),
            payee_id: "payee-1".to_string(),
            amount: Amount::from_minor_units(100),
            timestamp: 1_700_000_000,
        };

        let json = serde_json::to_vec(&event).unwrap();
        let back: PaymentCapturedEvent = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_payload_field_names() {
        let event = PaymentCapturedEvent {
            reference_id: "r".to_string(),
            payer_id: "a".to_string(),
            payee_id: "b".to_string(),
            amount: Amount::from_minor_units(1),
            timestamp: 42,
        };

        let value = serde_json::to_value(&event).unwrap();
        for field in ["reference_id", "payer_id", "payee_id", "amount", "timestamp"] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_partitioning_is_stable_and_in_range() {
        let key = "abcd1234abcd1234";
        let first = partition_for_key(key, TOPIC_PARTITIONS);
        for _ in 0..10 {
            assert_eq!(partition_for_key(key, TOPIC_PARTITIONS), first);
        }
        assert!((0..TOPIC_PARTITIONS).contains(&first));
    }

    #[test]
    fn test_partitioning_spreads_keys() {
        let hit_partitions: std::collections::HashSet<i32> = (0..100)
            .map(|i| partition_for_key(&format!("ref-{}", i), TOPIC_PARTITIONS))
            .collect();
        assert!(hit_partitions.len() > 1);
    }
}
