//! Logging configuration for the gateway.
//!
//! Logs go to stderr. `RUST_LOG` takes precedence over the CLI filter.

use tracing_subscriber::EnvFilter;

/// Builds the filter from `RUST_LOG`, falling back to `default_filter`.
pub fn build_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_filter))
        .with_target(true)
        .init();
}
