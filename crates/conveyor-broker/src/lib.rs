//! Message broker boundary.
//!
//! The outbox relay only needs [`Publisher`]; consumers need [`Broker`] to open
//! a [`Subscriber`] under a consumer group. [`redis::RedisStreamBroker`] is the
//! production adapter; `conveyor-testing` provides an in-memory one.

#![allow(async_fn_in_trait)]

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod port;
pub mod redis;

pub use error::BrokerError;
pub use message::{Delivery, Headers, OutboundMessage};
pub use port::{Broker, Publisher, Subscriber};
