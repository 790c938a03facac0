//! Shared value types and column names
//!
//! Every cell of the finished metrics table is a [`MetricValue`]. The
//! missing-value sentinel is a distinct variant rather than an empty string:
//! an empty recommendation text means "nothing wrong found", `"N/A"` means
//! "no source supplied this".

use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;

/// Literal rendered for values no source supplied
pub const MISSING: &str = "N/A";

/// Name of a tracked event; the case-sensitive join key across sources
pub type EventKey = String;

/// Canonical column names of the finished table
pub mod columns {
    pub const EVENT_NAME: &str = "event_name";
    pub const COMPOSITE_SCORE: &str = "compositeScore";
    pub const EMQ_RATING: &str = "emqRating";
    pub const BROWSER_HITS: &str = "browser_hits";
    pub const SERVER_HITS: &str = "server_hits";
    pub const SERVER_VS_BROWSER_DIFF_PCT: &str = "server_vs_browser_diff_pct";
    pub const ARC_PCT: &str = "ARC (%)";
    pub const HAS_DEDUPE_ISSUE: &str = "hasDedupeIssue";

    /// Suffix of the per-identifier coverage column from the quality source
    pub const COVERAGE_PERCENTAGE_SUFFIX: &str = "_coverage_percentage";
    /// Suffix of the per-identifier recommendation/issue column
    pub const RECOMMENDATION_OR_ISSUE_SUFFIX: &str = "_recommendation_or_issue";
}

/// All fixed canonical columns, in output order
pub const CANONICAL_COLUMNS: [&str; 17] = [
    columns::EVENT_NAME,
    columns::COMPOSITE_SCORE,
    columns::EMQ_RATING,
    columns::BROWSER_HITS,
    columns::SERVER_HITS,
    columns::SERVER_VS_BROWSER_DIFF_PCT,
    columns::ARC_PCT,
    columns::HAS_DEDUPE_ISSUE,
    "event_id_serverCoverage",
    "event_id_browserCoverage",
    "event_id_overlap",
    "external_id_serverCoverage",
    "external_id_browserCoverage",
    "external_id_overlap",
    "fbp_serverCoverage",
    "fbp_browserCoverage",
    "fbp_overlap",
];

/// Identifiers measured by the deduplication source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupeKey {
    EventId,
    ExternalId,
    Fbp,
}

impl DedupeKey {
    pub const ALL: [DedupeKey; 3] = [DedupeKey::EventId, DedupeKey::ExternalId, DedupeKey::Fbp];

    /// Identifier name as it appears in payloads and column prefixes
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventId => "event_id",
            Self::ExternalId => "external_id",
            Self::Fbp => "fbp",
        }
    }

    pub fn server_coverage_column(self) -> String {
        format!("{}_serverCoverage", self.as_str())
    }

    pub fn browser_coverage_column(self) -> String {
        format!("{}_browserCoverage", self.as_str())
    }

    pub fn overlap_column(self) -> String {
        format!("{}_overlap", self.as_str())
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of the metrics table
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// JSON number, kept as received (integers stay integers)
    Number(Number),
    Text(String),
    Bool(bool),
    /// Missing-value sentinel, serialised as `"N/A"`
    Missing,
}

impl MetricValue {
    /// Convert a payload value; absent and `null` become [`MetricValue::Missing`]
    ///
    /// Arrays and objects are kept as compact JSON text.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Number(n)) => Self::Number(n.clone()),
            Some(Value::String(s)) => Self::Text(s.clone()),
            Some(Value::Bool(b)) => Self::Bool(*b),
            Some(other) => Self::Text(other.to_string()),
        }
    }

    /// Wrap a computed float; non-finite values become the sentinel
    pub fn from_f64(value: f64) -> Self {
        Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or(Self::Missing)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view: numbers directly, text when it parses as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Missing => f.write_str(MISSING),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => n.serialize(serializer),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Missing => serializer.serialize_str(MISSING),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Round half up to two decimals (`floor(x * 100 + 0.5) / 100`)
pub fn round2(value: f64) -> f64 {
    // `+ 0.0` folds -0.0 into 0.0 so it never renders as "-0"
    (value * 100.0 + 0.5).floor() / 100.0 + 0.0
}

/// Truncate toward negative infinity at two decimals
pub fn truncate2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0 + 0.0
}
