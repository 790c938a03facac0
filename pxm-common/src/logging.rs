//! Tracing subscriber initialisation
//!
//! Logs go to stderr so stdout stays free for machine-readable output.

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Build the env filter: `RUST_LOG` wins, otherwise `level`
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", level, e))),
    }
}

/// Install the global fmt subscriber
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = build_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Config(format!("Tracing already initialised: {}", e)))
}
