//! Data access for settlements and durable consumer offsets

pub mod models;

use deadpool_postgres::Pool;
use settlement_common::PaymentCapturedEvent;
use tracing::info;

use crate::Result;
use models::{Settlement, STATUS_PENDING};

/// Data access for the settlement database.
pub struct SettlementStore {
    pool: Pool,
}

impl SettlementStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn health(&self) -> bool {
        settlement_common::db::health_check(&self.pool).await
    }

    /// Materialize a captured-payment event and advance the consumer offset
    /// in one transaction.
    ///
    /// The upsert keyed on the unique reference id makes redelivery converge
    /// on a single row; committing the offset with it means a crash replays
    /// the event into the same row instead of losing it.
    pub async fn apply_event(
        &self,
        topic: &str,
        partition: i32,
        next_offset: i64,
        event: &PaymentCapturedEvent,
    ) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let units = event.amount.minor_units();
        tx.execute(
            "INSERT INTO settlements (reference_id, payer_id, payee_id, amount, status)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (reference_id)
             DO UPDATE SET status = EXCLUDED.status, updated_at = now()",
            &[
                &event.reference_id,
                &event.payer_id,
                &event.payee_id,
                &units,
                &STATUS_PENDING,
            ],
        )
        .await?;

        upsert_offset(&tx, topic, partition, next_offset).await?;

        tx.commit().await?;
        info!(reference_id = %event.reference_id, "settlement materialized");
        Ok(())
    }

    pub async fn get_by_reference(&self, reference_id: &str) -> Result<Option<Settlement>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT reference_id, payer_id, payee_id, amount, status, created_at, updated_at
                 FROM settlements WHERE reference_id = $1",
                &[&reference_id],
            )
            .await?;
        row.as_ref().map(Settlement::from_row).transpose()
    }

    /// Next offset to fetch for a partition; zero when never consumed.
    pub async fn next_offset(&self, topic: &str, partition: i32) -> Result<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT next_offset FROM consumer_offsets WHERE topic = $1 AND partition = $2",
                &[&topic, &partition],
            )
            .await?;
        Ok(row.map(|r| r.get("next_offset")).unwrap_or(0))
    }

    /// Advance the offset without touching settlement rows (skipped
    /// messages).
    pub async fn commit_offset(&self, topic: &str, partition: i32, next_offset: i64) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        upsert_offset(&tx, topic, partition, next_offset).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn upsert_offset(
    tx: &deadpool_postgres::Transaction<'_>,
    topic: &str,
    partition: i32,
    next_offset: i64,
) -> Result<()> {
    tx.execute(
        "INSERT INTO consumer_offsets (topic, partition, next_offset)
         VALUES ($1, $2, $3)
         ON CONFLICT (topic, partition)
         DO UPDATE SET next_offset = EXCLUDED.next_offset, updated_at = now()",
        &[&topic, &partition, &next_offset],
    )
    .await?;
    Ok(())
}
