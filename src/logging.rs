//! Tracing setup: `RUST_LOG`-driven `EnvFilter` over a plain fmt subscriber.
//! The synchronous, no-OTLP analogue of `tvix_tracing::TracingBuilder` —
//! this subsystem has no distributed spans to export, just structured logs
//! a host process can capture.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global subscriber honoring `RUST_LOG`, defaulting to `info`
/// for this crate and `warn` for everything else when unset. Call once,
/// near process start; a second call is a no-op error from
/// `tracing`'s global dispatcher that callers can safely ignore.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,blobcas=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
