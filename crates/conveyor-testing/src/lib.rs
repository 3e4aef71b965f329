//! Test doubles for Conveyor components.
//!
//! [`InMemoryBroker`] and [`InMemoryOutboxStore`] honor the same contracts as
//! the Redis and Postgres adapters (group offsets, uncommitted redelivery,
//! claim exclusion) and expose handles for assertions and fault injection.
//! Use from tests only.

pub mod broker;
pub mod outbox;

pub use broker::{InMemoryBroker, InMemorySubscriber};
pub use outbox::{ClaimRecord, InMemoryClaimedBatch, InMemoryOutboxStore};
