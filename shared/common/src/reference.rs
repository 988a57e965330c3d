//! Reference-id generation
//!
//! A reference id is the single correlation token that follows a payment
//! through all three services. Clients may supply their own; when they do
//! not, Payments mints an opaque 16-hex-character identifier.

/// Generate a fresh opaque reference id (16 lowercase hex characters).
pub fn new_reference_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes)
}
