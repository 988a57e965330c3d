//! Outbox table access
//!
//! All writes happen inside a caller-owned transaction: the insert shares the
//! transaction of the business change that caused the event, and the
//! publisher's status updates share the transaction of its fetch so that a
//! crashed publisher leaves rows PENDING for the next pass.

use deadpool_postgres::Transaction;

use super::models::{OutboxEvent, OutboxStatus};
use crate::Result;

/// Maximum publish attempts before a row is parked as FAILED.
pub const MAX_RETRIES: i32 = 3;

/// Rows fetched per publisher pass.
const FETCH_LIMIT: i64 = 50;

pub async fn add_event(
    tx: &Transaction<'_>,
    event_type: &str,
    payload: &[u8],
) -> Result<()> {
    tx.execute(
        "INSERT INTO outbox_events (event_type, payload, status) VALUES ($1, $2, $3)",
        &[&event_type, &payload, &OutboxStatus::Pending.as_str()],
    )
    .await?;
    Ok(())
}

/// Fetch the oldest PENDING rows, skipping rows another publisher holds.
pub async fn fetch_pending(tx: &Transaction<'_>) -> Result<Vec<OutboxEvent>> {
    let rows = tx
        .query(
            "SELECT id, event_type, payload, retry_count, created_at
             FROM outbox_events
             WHERE status = $1
             ORDER BY created_at ASC
             LIMIT $2
             FOR UPDATE SKIP LOCKED",
            &[&OutboxStatus::Pending.as_str(), &FETCH_LIMIT],
        )
        .await?;
    rows.iter().map(OutboxEvent::from_row).collect()
}

pub async fn mark_published(tx: &Transaction<'_>, id: i64) -> Result<()> {
    set_status(tx, id, OutboxStatus::Published).await
}

pub async fn mark_failed(tx: &Transaction<'_>, id: i64) -> Result<()> {
    set_status(tx, id, OutboxStatus::Failed).await
}

pub async fn increment_retry(tx: &Transaction<'_>, id: i64) -> Result<()> {
    tx.execute(
        "UPDATE outbox_events SET retry_count = retry_count + 1, updated_at = now()
         WHERE id = $1",
        &[&id],
    )
    .await?;
    Ok(())
}

async fn set_status(tx: &Transaction<'_>, id: i64, status: OutboxStatus) -> Result<()> {
    tx.execute(
        "UPDATE outbox_events SET status = $1, updated_at = now() WHERE id = $2",
        &[&status.as_str(), &id],
    )
    .await?;
    Ok(())
}
