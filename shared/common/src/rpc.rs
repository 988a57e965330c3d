//! Wire types for the unary RPC surfaces
//!
//! Every request/response that crosses a service boundary is defined here so
//! caller and callee agree on shape. Failures are normal responses carrying
//! an enumerated kind, never transport-level errors.

use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a reserve/transfer/release call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpStatus {
    Success,
    Failed,
}

/// Enumerated failure kinds carried on RPC responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    InsufficientFunds,
    InvalidState,
    Duplicate,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorKind::NotFound => write!(f, "NOT_FOUND"),
            ErrorKind::InsufficientFunds => write!(f, "INSUFFICIENT_FUNDS"),
            ErrorKind::InvalidState => write!(f, "INVALID_STATE"),
            ErrorKind::Duplicate => write!(f, "DUPLICATE"),
            ErrorKind::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Lifecycle state of a funds reservation.
///
/// Shared on the wire: an `INVALID_STATE` failure from `Transfer` reports the
/// reservation's current state so the caller can tell an already-captured
/// reservation apart from a released one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Failed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Failed => "FAILED",
        }
    }

    /// A reservation in a terminal state never changes again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Confirmed | ReservationStatus::Failed)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "FAILED" => Ok(ReservationStatus::Failed),
            other => Err(format!("unknown reservation status: {}", other)),
        }
    }
}

/// Response for the three-step transfer primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub status: OpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Present on `INVALID_STATE` failures: the reservation's current state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_status: Option<ReservationStatus>,
    pub message: String,
}

impl TransferOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: OpStatus::Success,
            kind: None,
            reservation_status: None,
            message: message.into(),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: OpStatus::Failed,
            kind: Some(kind),
            reservation_status: None,
            message: message.into(),
        }
    }

    pub fn invalid_state(current: ReservationStatus, message: impl Into<String>) -> Self {
        Self {
            status: OpStatus::Failed,
            kind: Some(ErrorKind::InvalidState),
            reservation_status: Some(current),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OpStatus::Success
    }
}

/// Error body returned by the account CRUD endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Accounts service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub account_no: String,
    pub initial_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account_id: String,
    pub name: String,
    pub account_no: String,
    pub balance: Amount,
    pub reserved: Amount,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBalanceRequest {
    pub account_id: String,
    pub amount: Amount,
    pub is_credit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAccountsResponse {
    pub accounts: Vec<AccountResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveFundsRequest {
    pub reference_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseFundsRequest {
    pub reference_id: String,
}

// ---------------------------------------------------------------------------
// Payments service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub payer_id: String,
    pub payee_id: String,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntentOutcome {
    Authorized,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentResponse {
    pub reference_id: String,
    pub status: IntentOutcome,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturePaymentRequest {
    pub reference_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaptureOutcome {
    Captured,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturePaymentResponse {
    pub reference_id: String,
    pub status: CaptureOutcome,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Settlement service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementStatusResponse {
    pub reference_id: String,
    pub status: String,
}
