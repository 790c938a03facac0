//! Record finalizer
//!
//! Turns accumulated partial records into rows with the full canonical
//! column set. Unset canonical fields become the `"N/A"` sentinel; dynamic
//! identifier columns follow in discovery order.

use crate::accumulator::{EventAccumulator, PartialEventRecord};
use crate::types::{columns, truncate2, DedupeKey, MetricValue};
use indexmap::IndexMap;
use serde::Serialize;

/// A finished row: column name → value, in column order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FinishedEventRecord {
    fields: IndexMap<String, MetricValue>,
}

impl FinishedEventRecord {
    pub fn get(&self, column: &str) -> Option<&MetricValue> {
        self.fields.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Event name of this row
    pub fn event_name(&self) -> Option<&str> {
        self.get(columns::EVENT_NAME).and_then(MetricValue::as_str)
    }

    /// Copy of this row keeping only columns accepted by `keep`
    pub fn retain_columns<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|(name, _)| keep(name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

impl FromIterator<(String, MetricValue)> for FinishedEventRecord {
    fn from_iter<I: IntoIterator<Item = (String, MetricValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Finalize every accumulated record, in first-appearance order
pub fn finalize(acc: EventAccumulator) -> Vec<FinishedEventRecord> {
    acc.into_records().map(finalize_record).collect()
}

/// Fill one partial record out to the canonical schema
pub fn finalize_record(record: PartialEventRecord) -> FinishedEventRecord {
    let mut fields = IndexMap::with_capacity(17 + record.dynamic.len());

    fields.insert(
        columns::EVENT_NAME.to_string(),
        MetricValue::Text(record.event_name.clone()),
    );
    fields.insert(
        columns::COMPOSITE_SCORE.to_string(),
        format_composite_score(record.composite_score.as_ref()),
    );
    fields.insert(columns::EMQ_RATING.to_string(), or_missing(record.emq_rating.as_ref()));
    fields.insert(columns::BROWSER_HITS.to_string(), or_missing(record.browser_hits()));
    fields.insert(columns::SERVER_HITS.to_string(), or_missing(record.server_hits()));
    fields.insert(
        columns::SERVER_VS_BROWSER_DIFF_PCT.to_string(),
        record
            .diff()
            .map(|diff| MetricValue::Text(diff.render()))
            .unwrap_or(MetricValue::Missing),
    );
    fields.insert(columns::ARC_PCT.to_string(), or_missing(record.arc_pct.as_ref()));
    fields.insert(
        columns::HAS_DEDUPE_ISSUE.to_string(),
        or_missing(record.has_dedupe_issue.as_ref()),
    );

    for key in DedupeKey::ALL {
        let stats = record.identifier(key);
        fields.insert(key.server_coverage_column(), or_missing(stats.server_coverage.as_ref()));
        fields.insert(key.browser_coverage_column(), or_missing(stats.browser_coverage.as_ref()));
        fields.insert(key.overlap_column(), or_missing(stats.overlap.as_ref()));
    }

    for (column, value) in record.dynamic {
        fields.entry(column).or_insert(value);
    }

    FinishedEventRecord { fields }
}

/// Numeric scores truncate to two decimals as fixed text (`0.755` → `"0.75"`)
pub fn format_composite_score(score: Option<&MetricValue>) -> MetricValue {
    match score.and_then(MetricValue::as_f64) {
        Some(value) => MetricValue::Text(format!("{:.2}", truncate2(value))),
        None => MetricValue::Missing,
    }
}

fn or_missing(value: Option<&MetricValue>) -> MetricValue {
    value.cloned().unwrap_or(MetricValue::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CANONICAL_COLUMNS;

    #[test]
    fn test_empty_record_is_all_sentinels() {
        let row = finalize_record(PartialEventRecord::new("Lead"));

        let columns: Vec<_> = row.columns().collect();
        assert_eq!(columns, CANONICAL_COLUMNS.to_vec());
        assert_eq!(row.event_name(), Some("Lead"));
        for column in CANONICAL_COLUMNS.iter().skip(1) {
            assert_eq!(row.get(column), Some(&MetricValue::Missing), "{}", column);
        }
    }

    #[test]
    fn test_composite_score_truncates() {
        assert_eq!(
            format_composite_score(Some(&MetricValue::from(0.755))),
            MetricValue::from("0.75")
        );
        assert_eq!(
            format_composite_score(Some(&MetricValue::from(9))),
            MetricValue::from("9.00")
        );
        assert_eq!(
            format_composite_score(Some(&MetricValue::from("0.819"))),
            MetricValue::from("0.81")
        );
        assert_eq!(
            format_composite_score(Some(&MetricValue::from("GOOD"))),
            MetricValue::Missing
        );
        assert_eq!(format_composite_score(Some(&MetricValue::Missing)), MetricValue::Missing);
        assert_eq!(format_composite_score(None), MetricValue::Missing);
    }

    #[test]
    fn test_diff_needs_both_hit_counts() {
        let mut record = PartialEventRecord::new("Purchase");
        record.set_browser_hits(MetricValue::from(100));

        let row = finalize_record(record.clone());
        assert_eq!(row.get(columns::SERVER_VS_BROWSER_DIFF_PCT), Some(&MetricValue::Missing));
        assert_eq!(row.get(columns::BROWSER_HITS), Some(&MetricValue::from(100)));

        record.set_server_hits(MetricValue::from(60));
        let row = finalize_record(record);
        assert_eq!(
            row.get(columns::SERVER_VS_BROWSER_DIFF_PCT),
            Some(&MetricValue::from("-40% 📉"))
        );
    }

    #[test]
    fn test_dynamic_columns_follow_canonical() {
        let mut record = PartialEventRecord::new("Purchase");
        record.set_dynamic("phone_coverage_percentage", MetricValue::from(40));
        record.set_dynamic("phone_recommendation_or_issue", MetricValue::from(""));

        let row = finalize_record(record);
        let columns: Vec<_> = row.columns().skip(17).collect();
        assert_eq!(
            columns,
            vec!["phone_coverage_percentage", "phone_recommendation_or_issue"]
        );
        assert_eq!(row.get("phone_recommendation_or_issue"), Some(&MetricValue::from("")));
    }

    #[test]
    fn test_finalize_keeps_first_appearance_order() {
        let mut acc = EventAccumulator::new();
        acc.record_mut("ViewContent");
        acc.record_mut("Purchase");
        acc.record_mut("ViewContent");

        let names: Vec<_> = finalize(acc)
            .iter()
            .map(|row| row.event_name().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["ViewContent", "Purchase"]);
    }
}
