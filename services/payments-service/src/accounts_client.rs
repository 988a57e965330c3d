//! RPC client for the accounts service
//!
//! The trait seam keeps the orchestration logic testable without a live
//! accounts instance.

use async_trait::async_trait;
use settlement_common::rpc::{ReserveFundsRequest, TransferOutcome};

use crate::Result;

/// Unary calls the payments orchestrator makes against Accounts.
///
/// A returned `Err` is a transport fault; business failures arrive as
/// `TransferOutcome` with `status=FAILED` and an enumerated kind.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountsApi: Send + Sync {
    async fn reserve_funds(&self, request: ReserveFundsRequest) -> Result<TransferOutcome>;

    async fn transfer(&self, reference_id: String) -> Result<TransferOutcome>;

    async fn release_funds(&self, reference_id: String) -> Result<TransferOutcome>;
}

/// HTTP implementation talking to a live accounts service.
pub struct HttpAccountsClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAccountsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn post_outcome<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TransferOutcome> {
        let url = format!("{}/api/{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let outcome = response.json::<TransferOutcome>().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl AccountsApi for HttpAccountsClient {
    async fn reserve_funds(&self, request: ReserveFundsRequest) -> Result<TransferOutcome> {
        self.post_outcome("reservations/reserve", &request).await
    }

    async fn transfer(&self, reference_id: String) -> Result<TransferOutcome> {
        self.post_outcome(
            "reservations/transfer",
            &serde_json::json!({ "reference_id": reference_id }),
        )
        .await
    }

    async fn release_funds(&self, reference_id: String) -> Result<TransferOutcome> {
        self.post_outcome(
            "reservations/release",
            &serde_json::json!({ "reference_id": reference_id }),
        )
        .await
    }
}
