//! Data access for intents, payment transactions, outbox and idempotency

pub mod models;
pub mod outbox;

use deadpool_postgres::Pool;
use settlement_common::{Amount, EVENT_PAYMENT_CAPTURED};
use tracing::info;

use crate::Result;
use models::{IntentStatus, PaymentIntent, TxnType};

/// Data access for the payments database.
pub struct PaymentRepository {
    pool: Pool,
}

impl PaymentRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub async fn health(&self) -> bool {
        settlement_common::db::health_check(&self.pool).await
    }

    pub async fn get_intent(&self, reference_id: &str) -> Result<Option<PaymentIntent>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT reference_id, payer_id, payee_id, amount, status
                 FROM payment_intents WHERE reference_id = $1",
                &[&reference_id],
            )
            .await?;
        row.as_ref().map(PaymentIntent::from_row).transpose()
    }

    /// Insert a freshly authorized intent.
    pub async fn create_intent(
        &self,
        reference_id: &str,
        payer_id: &str,
        payee_id: &str,
        amount: Amount,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        let units = amount.minor_units();
        client
            .execute(
                "INSERT INTO payment_intents (reference_id, payer_id, payee_id, amount, status)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &reference_id,
                    &payer_id,
                    &payee_id,
                    &units,
                    &IntentStatus::Authorized.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Commit a capture locally: the two double-entry payment rows, the
    /// outbox event and the intent status change in one transaction. Once
    /// this commits the event's publication is guaranteed; until then no
    /// observer sees the capture.
    pub async fn capture_locally(&self, intent: &PaymentIntent, payload: &[u8]) -> Result<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let units = intent.amount.minor_units();
        tx.execute(
            "INSERT INTO payments (reference_id, account_id, amount, txn_type)
             VALUES ($1, $2, $3, $4)",
            &[
                &intent.reference_id,
                &intent.payer_id,
                &units,
                &TxnType::Debit.as_str(),
            ],
        )
        .await?;
        tx.execute(
            "INSERT INTO payments (reference_id, account_id, amount, txn_type)
             VALUES ($1, $2, $3, $4)",
            &[
                &intent.reference_id,
                &intent.payee_id,
                &units,
                &TxnType::Credit.as_str(),
            ],
        )
        .await?;

        outbox::add_event(&tx, EVENT_PAYMENT_CAPTURED, payload).await?;

        tx.execute(
            "UPDATE payment_intents SET status = $1 WHERE reference_id = $2",
            &[&IntentStatus::Captured.as_str(), &intent.reference_id],
        )
        .await?;

        tx.commit().await?;
        info!(reference_id = %intent.reference_id, "capture committed locally");
        Ok(())
    }

    pub async fn get_idempotent_response(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT response FROM idempotency_keys WHERE key = $1",
                &[&key],
            )
            .await?;
        Ok(row.map(|r| r.get("response")))
    }

    /// Store the response replayed to retries of this key.
    ///
    /// Concurrent writers of the same operation produce identical bytes; a
    /// later capture response replaces the intent response because capture
    /// is the terminal reply for the reference.
    pub async fn save_idempotent_response(&self, key: &str, response: &[u8]) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO idempotency_keys (key, response) VALUES ($1, $2)
                 ON CONFLICT (key) DO UPDATE SET response = EXCLUDED.response",
                &[&key, &response],
            )
            .await?;
        Ok(())
    }

    /// Payment transaction rows for a reference, for invariant checks.
    pub async fn count_payment_txns(&self, reference_id: &str) -> Result<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM payments WHERE reference_id = $1",
                &[&reference_id],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Outbox rows whose payload belongs to a reference, for invariant checks.
    pub async fn count_outbox_events(&self, reference_id: &str) -> Result<i64> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT payload FROM outbox_events WHERE event_type = $1",
                &[&EVENT_PAYMENT_CAPTURED],
            )
            .await?;

        let mut count = 0;
        for row in rows {
            let payload: Vec<u8> = row.get("payload");
            if let Ok(event) =
                serde_json::from_slice::<settlement_common::PaymentCapturedEvent>(&payload)
            {
                if event.reference_id == reference_id {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}
