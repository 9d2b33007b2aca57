//! Logging configuration for the relay.
//!
//! The server logs to stderr so output composes with systemd, containers,
//! and test harness capture alike.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging with env-filter support.
///
/// `RUST_LOG` controls verbosity; defaults to `info` with per-request noise
/// from hyper and sqlx suppressed unless explicitly enabled.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
