//! Ambient building blocks shared by every Conveyor service: env config,
//! tracing, health endpoints, request ids, retry backoff and shutdown.

pub mod backoff;
pub mod config;
pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod serde;
pub mod shutdown;
pub mod tracing;
