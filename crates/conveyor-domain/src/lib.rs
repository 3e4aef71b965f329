//! Domain types shared across all Conveyor services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; never reach for infra from here.

pub mod event;
pub mod id;
pub mod task;
