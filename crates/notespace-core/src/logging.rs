//! Tracing subscriber setup.
//!
//! Host processes (server, worker, test harnesses) call [`init`] once at
//! startup; the library crates only emit through `tracing` and never
//! install a subscriber themselves.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::logging::LoggingConfig;

/// Install the global tracing subscriber from logging configuration.
///
/// `RUST_LOG` overrides the configured level when set. Calling this twice
/// is an error from `tracing_subscriber::init`, so only the process entry
/// point should call it.
pub fn init(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
