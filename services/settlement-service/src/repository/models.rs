use chrono::{DateTime, Utc};
use settlement_common::Amount;
use tokio_postgres::Row;

use crate::Result;

/// Settlement status written on first materialization. Enrichment steps
/// downstream may move a row past this.
pub const STATUS_PENDING: &str = "PENDING";

/// Settlement row in the database
#[derive(Debug, Clone)]
pub struct Settlement {
    pub reference_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: Amount,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Settlement {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            reference_id: row.try_get("reference_id")?,
            payer_id: row.try_get("payer_id")?,
            payee_id: row.try_get("payee_id")?,
            amount: Amount::from_minor_units(row.try_get("amount")?),
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
