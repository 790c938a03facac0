//! # PXM Common Library
//!
//! Shared code for the PXM pixel/CAPI metrics tools including:
//! - Error and result types
//! - TOML configuration loading and resolution
//! - Tracing subscriber initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
