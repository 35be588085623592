//! Shared helpers: tracing setup and environment utilities.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the given default log level.
///
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Read a non-empty environment variable.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
