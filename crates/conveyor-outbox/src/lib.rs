//! Transactional outbox.
//!
//! Producers call [`append_event`] on the same transaction as their business
//! write. An [`OutboxRelay`] later claims pending rows, publishes them and
//! marks them published. Delivery is at-least-once: a crash between publish
//! and mark republishes on the next cycle, so consumers deduplicate on the
//! `event_id` header.

#![allow(async_fn_in_trait)]

pub mod db;
pub mod entity;
pub mod event;
pub mod relay;
pub mod store;

pub use db::DbOutboxStore;
pub use event::{OutboxEvent, append_event};
pub use relay::{OutboxRelay, RelayConfig, RelayReport};
pub use store::{ClaimedBatch, OutboxError, OutboxStore};
