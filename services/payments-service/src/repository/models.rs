use chrono::{DateTime, Utc};
use settlement_common::Amount;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::Row;

use crate::{Error, Result};

/// Lifecycle state of a payment intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
    Authorized,
    Captured,
    Failed,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Authorized => "AUTHORIZED",
            IntentStatus::Captured => "CAPTURED",
            IntentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "AUTHORIZED" => Ok(IntentStatus::Authorized),
            "CAPTURED" => Ok(IntentStatus::Captured),
            "FAILED" => Ok(IntentStatus::Failed),
            other => Err(format!("unknown intent status: {}", other)),
        }
    }
}

/// Payment intent row in the database
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub reference_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: Amount,
    pub status: IntentStatus,
}

impl PaymentIntent {
    pub fn from_row(row: &Row) -> Result<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            reference_id: row.try_get("reference_id")?,
            payer_id: row.try_get("payer_id")?,
            payee_id: row.try_get("payee_id")?,
            amount: Amount::from_minor_units(row.try_get("amount")?),
            status: status.parse().map_err(Error::Database)?,
        })
    }
}

/// Double-entry direction of a payment transaction row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnType {
    Debit,
    Credit,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Debit => "DEBIT",
            TxnType::Credit => "CREDIT",
        }
    }
}

/// Delivery state of an outbox row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Published,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Published => "PUBLISHED",
            OutboxStatus::Failed => "FAILED",
        }
    }
}

/// Outbox row in the database
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: i64,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            retry_count: row.try_get("retry_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_status_round_trip() {
        for status in [
            IntentStatus::Authorized,
            IntentStatus::Captured,
            IntentStatus::Failed,
        ] {
            let parsed: IntentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("SETTLED".parse::<IntentStatus>().is_err());
    }

    #[test]
    fn test_txn_type_labels() {
        assert_eq!(TxnType::Debit.as_str(), "DEBIT");
        assert_eq!(TxnType::Credit.as_str(), "CREDIT");
    }
}
