//! Event emission: bus producer and the outbox polling relay

pub mod producer;
pub mod publisher;

pub use producer::{EventPublisher, KafkaProducer};
pub use publisher::OutboxPublisher;
