//! Accounts Service
//!
//! Authoritative balance ledger for the settlement pipeline. Exposes account
//! CRUD plus the three-step transfer primitive (reserve, transfer, release)
//! backed by row-locked transactions and a per-reference reservation state
//! machine.

pub mod api;
pub mod config;
pub mod ledger;

use settlement_common::{Amount, ErrorKind, ReservationStatus};
use thiserror::Error;

pub use config::AccountsConfig;
pub use ledger::AccountStore;

/// Main error type for the accounts service
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("insufficient funds: have {available}, need {requested}")]
    InsufficientFunds {
        available: Amount,
        requested: Amount,
    },

    #[error("reservation {reference_id} is {status}, expected PENDING")]
    InvalidState {
        reference_id: String,
        status: ReservationStatus,
    },

    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The enumerated kind carried on RPC responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::InvalidState { .. } => ErrorKind::InvalidState,
            Error::Duplicate(_) => ErrorKind::Duplicate,
            Error::Database(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }
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

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = Error::InsufficientFunds {
            available: Amount::from_minor_units(50),
            requested: Amount::from_minor_units(100),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(err.to_string(), "insufficient funds: have 50, need 100");

        let err = Error::InvalidState {
            reference_id: "ref-1".to_string(),
            status: ReservationStatus::Confirmed,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        assert_eq!(
            Error::Duplicate("reference_id ref-1".to_string()).kind(),
            ErrorKind::Duplicate
        );
        assert_eq!(
            Error::Database("connection reset".to_string()).kind(),
            ErrorKind::Internal
        );
    }
}
