//! Logging setup for the provider process.
//!
//! Logs go to **stderr** because stdout carries the handshake line the host
//! reads on startup. `RUST_LOG` controls filtering, for example
//! `RUST_LOG=hemmer_provider_authsignal=debug` to see every API call.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn try_init_with(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

/// Install the stderr subscriber at `info` unless `RUST_LOG` says otherwise.
///
/// A second call is a no-op apart from a warning on stderr.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LEVEL);
}

/// Like [`init_logging`], with a different default level.
pub fn init_logging_with_default(default_level: &str) {
    if !try_init_with(default_level) {
        eprintln!("logging already initialized");
    }
}

/// Install the subscriber, returning `false` if one was already set.
pub fn try_init_logging() -> bool {
    try_init_with(DEFAULT_LEVEL)
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // filter parsing is checked here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_authsignal=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_authsignal::client=debug").is_ok());
    }
}
