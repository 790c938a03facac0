//! Error types for pxm-har
//!
//! Only batch-fatal conditions are errors. A bad capture inside an otherwise
//! valid file is a [`crate::sources::SkipReason`], never a `HarError`.

use std::path::PathBuf;
use thiserror::Error;

/// Batch-fatal pipeline error
#[derive(Debug, Error)]
pub enum HarError {
    /// One or more of the four required file types is absent
    #[error("Missing required files: {}", .missing.join(", "))]
    MissingFiles { missing: Vec<String> },

    /// All types are present but the batch is not exactly four files
    #[error("Please supply exactly {expected} HAR files (got {found})")]
    WrongFileCount { expected: usize, found: usize },

    /// A whole file is not a parseable HAR document
    #[error("Invalid JSON in {file}")]
    InvalidJson {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// A file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for batch operations
pub type HarResult<T> = Result<T, HarError>;

/// Why a single response body could not be turned into JSON
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("response body is empty")]
    Empty,

    #[error("response body is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}
