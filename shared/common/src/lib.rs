//! Shared building blocks for the settlement pipeline
//!
//! Everything that crosses a service boundary lives here: the wire types for
//! the unary RPC surfaces, the captured-payment event payload, the monetary
//! amount representation, and the reference-id generator. Each service keeps
//! its own database; the only identifier that travels between them is the
//! reference id.

pub mod db;
pub mod event;
pub mod money;
pub mod reference;
pub mod rpc;

pub use event::{PaymentCapturedEvent, EVENT_PAYMENT_CAPTURED};
pub use money::Amount;
pub use reference::new_reference_id;
pub use rpc::{ErrorKind, OpStatus, ReservationStatus, TransferOutcome};
