use chrono::{DateTime, Utc};
use settlement_common::rpc::AccountResponse;
use settlement_common::{Amount, ReservationStatus};
use tokio_postgres::Row;

use crate::{Error, Result};

/// Account row in the database
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_no: String,
    pub balance: Amount,
    pub reserved: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            account_no: row.try_get("account_no")?,
            balance: Amount::from_minor_units(row.try_get("balance")?),
            reserved: Amount::from_minor_units(row.try_get("reserved")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub fn into_response(self) -> AccountResponse {
        AccountResponse {
            account_id: self.id,
            name: self.name,
            account_no: self.account_no,
            balance: self.balance,
            reserved: self.reserved,
            created_at: self.created_at,
        }
    }
}

/// Reservation row in the database
#[derive(Debug, Clone)]
pub struct Reservation {
    pub reference_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: Amount,
    pub status: ReservationStatus,
}

impl Reservation {
    pub fn from_row(row: &Row) -> Result<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            reference_id: row.try_get("reference_id")?,
            payer_id: row.try_get("payer_id")?,
            payee_id: row.try_get("payee_id")?,
            amount: Amount::from_minor_units(row.try_get("amount")?),
            status: status
                .parse()
                .map_err(|e: String| Error::Database(e))?,
        })
    }
}

/// Audit trail state for a reference id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerStatus {
    Initiated,
    Completed,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Initiated => "INITIATED",
            LedgerStatus::Completed => "COMPLETED",
            LedgerStatus::Failed => "FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ledger_status_labels() {
        assert_eq!(LedgerStatus::Initiated.as_str(), "INITIATED");
        assert_eq!(LedgerStatus::Completed.as_str(), "COMPLETED");
        assert_eq!(LedgerStatus::Failed.as_str(), "FAILED");
    }

    #[test]
    fn test_account_into_response() {
        let now = Utc::now();
        let account = Account {
            id: "acct-1".to_string(),
            name: "Alice".to_string(),
            account_no: "ACC-0001".to_string(),
            balance: Amount::from_minor_units(900),
            reserved: Amount::from_minor_units(100),
            created_at: now,
            updated_at: now,
        };

        let resp = account.into_response();
        assert_eq!(resp.account_id, "acct-1");
        assert_eq!(resp.balance, Amount::from_minor_units(900));
        assert_eq!(resp.reserved, Amount::from_minor_units(100));
    }
}
