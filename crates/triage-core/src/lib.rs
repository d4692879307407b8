//! Domain model, message fabric, audit log, event bus, and persistence for
//! the misinformation triage pipeline.
//!
//! This crate is the foundation every other crate in the workspace builds
//! on (`triage-index`, `triage-enrich`, `triage-verify`, `triage-review`),
//! in the same role `weavegraph`'s core module plays for `wg-bastion` and
//! `wg-ragsmith`.

pub mod audit;
pub mod config;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod fabric;
pub mod observability;
pub mod persistence;
pub mod runtime;

#[cfg(test)]
mod property_tests;

pub use error::{Classify, CoreError, ErrorKind, Result};
pub use observability::init_tracing;
pub use runtime::TriageRuntime;
