//! Tracing initialization for embedding applications.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber.
///
/// Reads the filter from `RUST_LOG`, falling back to `clinica=debug`.
/// Calling this twice panics (the global subscriber can only be set once),
/// so embedders should call it exactly once at startup.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinica=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
