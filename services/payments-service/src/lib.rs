//! Payments Service
//!
//! Orchestrates payment intents against the Accounts ledger and emits
//! captured-payment events through a transactional outbox. The outbox row,
//! the payment transaction rows and the intent status change always share
//! one database transaction; a background publisher relays committed events
//! to the message bus.

pub mod accounts_client;
pub mod api;
pub mod config;
pub mod events;
pub mod repository;
pub mod service;

use thiserror::Error;

pub use accounts_client::{AccountsApi, HttpAccountsClient};
pub use config::PaymentsConfig;
pub use repository::PaymentRepository;
pub use service::PaymentService;

/// Main error type for the payments service
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("accounts rpc error: {0}")]
    Rpc(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("publish error: {0}")]
    Publish(String),
}

impl From<tokio_postgres::Error> for Error {
    fn from(e: tokio_postgres::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for Error {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Rpc(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
