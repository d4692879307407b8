//! Ambient logging init, grounded on the teacher's own
//! `errors_pretty.rs::init_tracing` example: an `EnvFilter`-scoped `fmt`
//! layer plus `tracing_error::ErrorLayer` so `miette`/`eyre`-style error
//! reports downstream can capture a `SpanTrace`.
//!
//! Every worker/consumer binary built on this crate is expected to call
//! [`init_tracing`] once at startup, before constructing a
//! [`crate::TriageRuntime`].

use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` (defaulting to
/// `info` for this workspace's crates), layered with an `ErrorLayer` for
/// span-trace capture. Safe to call at most once per process; a second
/// call is a logic error in the caller, not something this function
/// guards against.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("triage_core=info".parse().unwrap())
            .add_directive("triage_enrich=info".parse().unwrap())
            .add_directive("triage_verify=info".parse().unwrap())
            .add_directive("triage_review=info".parse().unwrap())
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(filter)
        .with(ErrorLayer::default())
        .init();
}
