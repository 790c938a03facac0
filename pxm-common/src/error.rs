//! Common error types for PXM

use thiserror::Error;

/// Common result type for PXM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across PXM crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
