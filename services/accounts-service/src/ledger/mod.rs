//! Balance engine and reservation state machine
//!
//! Every mutating path opens a transaction, takes `SELECT ... FOR UPDATE` row
//! locks on the touched accounts, performs checked arithmetic and commits.
//! Reservations move funds from `balance` into `reserved`; a transfer drains
//! `reserved` into the payee's balance, a release moves it back. Terminal
//! reservation states are absorbing, which is what makes retries safe.

pub mod models;

use deadpool_postgres::{Pool, Transaction};
use settlement_common::{Amount, ReservationStatus};
use tokio_postgres::error::SqlState;
use tracing::info;

use crate::{Error, Result};
use models::{Account, LedgerStatus, Reservation};

fn is_unique_violation(e: &tokio_postgres::Error) -> bool {
    e.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

/// Data access for accounts, reservations and the ledger audit trail.
pub struct AccountStore {
    pool: Pool,
}

impl AccountStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Verify the backing database still serves queries.
    pub async fn health(&self) -> bool {
        settlement_common::db::health_check(&self.pool).await
    }

    /// Create an account with a zero reserved balance.
    pub async fn create_account(
        &self,
        name: &str,
        account_no: &str,
        initial_balance: Amount,
    ) -> Result<Account> {
        let client = self.pool.get().await?;
        let id = hex::encode(rand::random::<[u8; 16]>());
        let balance = initial_balance.minor_units();

        let row = client
            .query_one(
                "INSERT INTO accounts (id, name, account_no, balance, reserved)
                 VALUES ($1, $2, $3, $4, 0)
                 RETURNING id, name, account_no, balance, reserved, created_at, updated_at",
                &[&id, &name, &account_no, &balance],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Duplicate(format!("account_no {}", account_no))
                } else {
                    Error::from(e)
                }
            })?;

        let account = Account::from_row(&row)?;
        info!(account_id = %account.id, account_no, "account created");
        Ok(account)
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Account> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, name, account_no, balance, reserved, created_at, updated_at
                 FROM accounts WHERE id = $1",
                &[&account_id],
            )
            .await?
            .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))?;
        Account::from_row(&row)
    }

    /// Credit or debit an account under a row lock.
    ///
    /// Debits fail with `InsufficientFunds` when the available balance does
    /// not cover the amount; the reserved balance is never touched here.
    pub async fn update_balance(
        &self,
        account_id: &str,
        amount: Amount,
        is_credit: bool,
    ) -> Result<Account> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let account = lock_account(&tx, account_id).await?;
        let new_balance = if is_credit {
            account
                .balance
                .checked_add(amount)
                .ok_or_else(|| Error::Internal("balance overflow".to_string()))?
        } else {
            if account.balance < amount {
                return Err(Error::InsufficientFunds {
                    available: account.balance,
                    requested: amount,
                });
            }
            account
                .balance
                .checked_sub(amount)
                .ok_or_else(|| Error::Internal("balance underflow".to_string()))?
        };

        let units = new_balance.minor_units();
        tx.execute(
            "UPDATE accounts SET balance = $1, updated_at = now() WHERE id = $2",
            &[&units, &account_id],
        )
        .await?;
        tx.commit().await?;

        self.get_account(account_id).await
    }

    /// Most recent accounts first, capped at 1000 rows.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, name, account_no, balance, reserved, created_at, updated_at
                 FROM accounts ORDER BY created_at DESC LIMIT 1000",
                &[],
            )
            .await?;
        rows.iter().map(Account::from_row).collect()
    }

    /// Place a hold on the payer's funds.
    ///
    /// Atomically: lock the payer row, check the available balance, move the
    /// amount from `balance` to `reserved`, insert the PENDING reservation
    /// and the INITIATED ledger row. A duplicate reference id aborts the
    /// whole transaction.
    pub async fn reserve_funds(
        &self,
        reference_id: &str,
        payer_id: &str,
        payee_id: &str,
        amount: Amount,
    ) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let payer = lock_account(&tx, payer_id).await?;
        let payee_exists = tx
            .query_opt("SELECT id FROM accounts WHERE id = $1", &[&payee_id])
            .await?;
        if payee_exists.is_none() {
            return Err(Error::NotFound(format!("account {}", payee_id)));
        }

        if payer.balance < amount {
            return Err(Error::InsufficientFunds {
                available: payer.balance,
                requested: amount,
            });
        }

        let new_balance = payer
            .balance
            .checked_sub(amount)
            .ok_or_else(|| Error::Internal("balance underflow".to_string()))?
            .minor_units();
        let new_reserved = payer
            .reserved
            .checked_add(amount)
            .ok_or_else(|| Error::Internal("reserved overflow".to_string()))?
            .minor_units();
        tx.execute(
            "UPDATE accounts SET balance = $1, reserved = $2, updated_at = now() WHERE id = $3",
            &[&new_balance, &new_reserved, &payer_id],
        )
        .await?;

        let units = amount.minor_units();
        tx.execute(
            "INSERT INTO reservations (reference_id, payer_id, payee_id, amount, status)
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &reference_id,
                &payer_id,
                &payee_id,
                &units,
                &ReservationStatus::Pending.as_str(),
            ],
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Duplicate(format!("reference_id {}", reference_id))
            } else {
                Error::from(e)
            }
        })?;

        insert_ledger_entry(&tx, payer_id, payee_id, amount, reference_id, LedgerStatus::Initiated)
            .await?;

        tx.commit().await?;
        info!(reference_id, payer_id, %amount, "funds reserved");
        Ok(())
    }

    /// Commit a PENDING reservation: drain the payer's hold into the payee's
    /// balance and mark the reservation CONFIRMED.
    pub async fn transfer(&self, reference_id: &str) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let reservation = lock_pending_reservation(&tx, reference_id).await?;
        let (payer, payee) =
            lock_account_pair(&tx, &reservation.payer_id, &reservation.payee_id).await?;

        let payer_reserved = payer
            .reserved
            .checked_sub(reservation.amount)
            .ok_or_else(|| Error::Internal("reserved underflow".to_string()))?
            .minor_units();
        let payee_balance = payee
            .balance
            .checked_add(reservation.amount)
            .ok_or_else(|| Error::Internal("balance overflow".to_string()))?
            .minor_units();

        tx.execute(
            "UPDATE accounts SET reserved = $1, updated_at = now() WHERE id = $2",
            &[&payer_reserved, &reservation.payer_id],
        )
        .await?;
        tx.execute(
            "UPDATE accounts SET balance = $1, updated_at = now() WHERE id = $2",
            &[&payee_balance, &reservation.payee_id],
        )
        .await?;

        finish_reservation(&tx, reference_id, ReservationStatus::Confirmed, LedgerStatus::Completed)
            .await?;

        tx.commit().await?;
        info!(reference_id, "reservation confirmed");
        Ok(())
    }

    /// Cancel a PENDING reservation and restore the payer's balance.
    pub async fn release_funds(&self, reference_id: &str) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let reservation = lock_pending_reservation(&tx, reference_id).await?;
        let payer = lock_account(&tx, &reservation.payer_id).await?;

        let new_reserved = payer
            .reserved
            .checked_sub(reservation.amount)
            .ok_or_else(|| Error::Internal("reserved underflow".to_string()))?
            .minor_units();
        let new_balance = payer
            .balance
            .checked_add(reservation.amount)
            .ok_or_else(|| Error::Internal("balance overflow".to_string()))?
            .minor_units();

        tx.execute(
            "UPDATE accounts SET balance = $1, reserved = $2, updated_at = now() WHERE id = $3",
            &[&new_balance, &new_reserved, &reservation.payer_id],
        )
        .await?;

        finish_reservation(&tx, reference_id, ReservationStatus::Failed, LedgerStatus::Failed)
            .await?;

        tx.commit().await?;
        info!(reference_id, "reservation released");
        Ok(())
    }
}

/// Lock an account row for the duration of the transaction.
async fn lock_account(tx: &Transaction<'_>, account_id: &str) -> Result<Account> {
    let row = tx
        .query_opt(
            "SELECT id, name, account_no, balance, reserved, created_at, updated_at
             FROM accounts WHERE id = $1 FOR UPDATE",
            &[&account_id],
        )
        .await?
        .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))?;
    Account::from_row(&row)
}

/// Lock two account rows in sorted id order so concurrent transfers touching
/// the same pair cannot deadlock.
async fn lock_account_pair(
    tx: &Transaction<'_>,
    payer_id: &str,
    payee_id: &str,
) -> Result<(Account, Account)> {
    let (first, second) = if payer_id <= payee_id {
        (payer_id, payee_id)
    } else {
        (payee_id, payer_id)
    };

    let first_account = lock_account(tx, first).await?;
    let second_account = lock_account(tx, second).await?;

    if first == payer_id {
        Ok((first_account, second_account))
    } else {
        Ok((second_account, first_account))
    }
}

/// Lock the reservation row and insist it is still PENDING.
///
/// The row lock serializes the terminal transition; a reservation already in
/// a terminal state yields `InvalidState` with no side effect.
async fn lock_pending_reservation(
    tx: &Transaction<'_>,
    reference_id: &str,
) -> Result<Reservation> {
    let row = tx
        .query_opt(
            "SELECT reference_id, payer_id, payee_id, amount, status
             FROM reservations WHERE reference_id = $1 FOR UPDATE",
            &[&reference_id],
        )
        .await?
        .ok_or_else(|| Error::NotFound(format!("reservation {}", reference_id)))?;

    let reservation = Reservation::from_row(&row)?;
    if reservation.status != ReservationStatus::Pending {
        return Err(Error::InvalidState {
            reference_id: reference_id.to_string(),
            status: reservation.status,
        });
    }
    Ok(reservation)
}

async fn finish_reservation(
    tx: &Transaction<'_>,
    reference_id: &str,
    status: ReservationStatus,
    ledger_status: LedgerStatus,
) -> Result<()> {
    tx.execute(
        "UPDATE reservations SET status = $1, updated_at = now() WHERE reference_id = $2",
        &[&status.as_str(), &reference_id],
    )
    .await?;
    tx.execute(
        "UPDATE ledger SET status = $1 WHERE reference_id = $2",
        &[&ledger_status.as_str(), &reference_id],
    )
    .await?;
    Ok(())
}

async fn insert_ledger_entry(
    tx: &Transaction<'_>,
    payer_id: &str,
    payee_id: &str,
    amount: Amount,
    reference_id: &str,
    status: LedgerStatus,
) -> Result<()> {
    let units = amount.minor_units();
    tx.execute(
        "INSERT INTO ledger (payer_id, payee_id, amount, reference_id, status)
         VALUES ($1, $2, $3, $4, $5)",
        &[&payer_id, &payee_id, &units, &reference_id, &status.as_str()],
    )
    .await?;
    Ok(())
}
