//! Subscriber setup for the command-line binary.
//!
//! The library itself only emits `tracing` events and never installs a subscriber.

use std::env;
use std::error::Error;

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::DEFAULT_LOG_LEVEL;

/// Builds the filter: `RUST_LOG` directives win, then `level`, then `info`.
pub fn build_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Installs a stderr fmt subscriber; stdout stays free for model output.
pub fn init_logging(level: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let rust_log = env::var("RUST_LOG").ok();
    fmt::Subscriber::builder()
        .with_env_filter(build_filter(rust_log.as_deref(), level))
        .with_writer(std::io::stderr)
        .try_init()?;
    tracing::debug!(level, "logging initialized");
    Ok(())
}
