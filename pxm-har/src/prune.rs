//! Recommendation column pruning
//!
//! Drops every "recommendation or issue" column from a finished table, for
//! consumers that only want the numeric metrics. Inputs are never mutated.

use crate::finalize::FinishedEventRecord;
use indexmap::IndexSet;
use tracing::debug;

/// Normalized column-name suffix marking a recommendation column
pub const RECOMMENDATION_SUFFIX: &str = "recommendation or issue";

/// Whether `column` names a recommendation/issue column
///
/// Case-insensitive, with underscores read as spaces, so both
/// `email_recommendation_or_issue` and `Email Recommendation or Issue` match.
pub fn is_recommendation_column(column: &str) -> bool {
    column
        .to_lowercase()
        .replace('_', " ")
        .ends_with(RECOMMENDATION_SUFFIX)
}

/// Recommendation columns present in any row, in first-seen order
pub fn recommendation_columns(records: &[FinishedEventRecord]) -> Vec<String> {
    let found: IndexSet<&str> = records
        .iter()
        .flat_map(FinishedEventRecord::columns)
        .filter(|column| is_recommendation_column(column))
        .collect();
    found.into_iter().map(str::to_string).collect()
}

/// New table without any recommendation/issue column
pub fn prune_recommendation_columns(records: &[FinishedEventRecord]) -> Vec<FinishedEventRecord> {
    let doomed: IndexSet<String> = recommendation_columns(records).into_iter().collect();
    if doomed.is_empty() {
        return records.to_vec();
    }

    debug!(columns = ?doomed, "Pruning recommendation columns");
    records
        .iter()
        .map(|record| record.retain_columns(|column| !doomed.contains(column)))
        .collect()
}
