//! pxm-har library interface
//!
//! Merges four HAR exports from the ads tooling (setup quality, event
//! counts, additional attributed conversions, deduplication) into one
//! per-event metrics table.

pub mod accumulator;
pub mod capture;
pub mod error;
pub mod finalize;
pub mod pipeline;
pub mod prune;
pub mod sources;
pub mod types;

pub use crate::error::{HarError, HarResult};
pub use crate::finalize::FinishedEventRecord;
pub use crate::pipeline::{build_metrics, build_metrics_from_paths, HarFile, MetricsReport};
pub use crate::prune::prune_recommendation_columns;
pub use crate::sources::{IngestSummary, SkipReason, SourceKind};
pub use crate::types::MetricValue;
