//! Settlement Service
//!
//! Consumes captured-payment events from the bus and materializes one
//! settlement row per reference id. The consumer offset lives in the same
//! database as the settlement rows and advances in the same transaction as
//! the upsert, which turns at-least-once delivery into effectively-once
//! materialization. A small read-only API serves settlement status.

pub mod api;
pub mod config;
pub mod consumer;
pub mod repository;

use thiserror::Error;

pub use config::SettlementConfig;
pub use consumer::SettlementConsumer;
pub use repository::SettlementStore;

/// Main error type for the settlement service
#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Database(String),

    #[error("bus error: {0}")]
    Bus(String),

    #[error("serialization error: {0}")]
    Serialization(String),
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

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
