pub mod api;
pub mod config;
pub mod db;
pub mod documents;
pub mod face;
pub mod push;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `fallback` when set. Calling this twice is a no-op.
pub fn init_tracing(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .try_init();
}
