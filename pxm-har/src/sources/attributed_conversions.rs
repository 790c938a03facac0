// Additional Attributed Conversions Mapper
//
// Reads `additional_attributed_conversions` captures: the share of
// conversions attributed only thanks to server-side events (ARC), and the
// dedupe-issue flag carried on the same item.

use super::{data_items, event_name, Applied, EntryOutcome, SkipReason, SourceKind, SourceMapper};
use crate::accumulator::EventAccumulator;
use crate::capture::RawCapture;
use crate::types::{round2, MetricValue};
use serde_json::Value;

/// Mapper for the additional attributed conversions export
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributedConversionsMapper;

impl SourceMapper for AttributedConversionsMapper {
    fn kind(&self) -> SourceKind {
        SourceKind::AttributedConversions
    }

    fn apply(&self, acc: &mut EventAccumulator, capture: &RawCapture) -> EntryOutcome {
        let payload = capture
            .payload()
            .map_err(|_| SkipReason::UnparseablePayload)?;
        let items = data_items(&payload).ok_or(SkipReason::MissingPayloadData)?;

        let mut applied = Applied::default();
        for item in items {
            let Some(name) = event_name(item.get("eventName")) else {
                applied.skipped_items.push(SkipReason::MalformedItem);
                continue;
            };

            let record = acc.record_mut(name);
            record.arc_pct = Some(arc_percentage(item.get("additionalConversions")));
            // hasDedupeIssue is owned by this source; absent flags leave it unset
            if let Some(flag) = item.get("hasDedupeIssue").and_then(Value::as_bool) {
                record.has_dedupe_issue = Some(MetricValue::Bool(flag));
            }
            applied.updates += 1;
        }

        Ok(applied)
    }
}

/// Fraction of additional conversions as a percentage with two decimals
pub fn arc_percentage(value: Option<&Value>) -> MetricValue {
    value
        .and_then(Value::as_f64)
        .map(|fraction| MetricValue::from_f64(round2(fraction * 100.0)))
        .unwrap_or(MetricValue::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arc(items: Value) -> RawCapture {
        RawCapture::new(None, format!("for (;;);{}", json!({"payload": {"data": items}})))
    }

    #[test]
    fn test_arc_percentage() {
        assert_eq!(arc_percentage(Some(&json!(0.12345))), MetricValue::from(12.35));
        assert_eq!(arc_percentage(Some(&json!(0))), MetricValue::from(0.0));
        assert_eq!(arc_percentage(Some(&json!("0.5"))), MetricValue::Missing);
        assert_eq!(arc_percentage(None), MetricValue::Missing);
    }

    #[test]
    fn test_items_and_dedupe_flag() {
        let mut acc = EventAccumulator::new();
        let outcome = AttributedConversionsMapper
            .apply(
                &mut acc,
                &arc(json!([
                    {"eventName": "Purchase", "additionalConversions": 0.031, "hasDedupeIssue": true},
                    {"eventName": "Lead"},
                    {"additionalConversions": 0.5}
                ])),
            )
            .unwrap();

        assert_eq!(outcome.updates, 2);
        assert_eq!(outcome.skipped_items, vec![SkipReason::MalformedItem]);

        let purchase = acc.get("Purchase").unwrap();
        assert_eq!(purchase.arc_pct, Some(MetricValue::from(3.1)));
        assert_eq!(purchase.has_dedupe_issue, Some(MetricValue::Bool(true)));

        let lead = acc.get("Lead").unwrap();
        assert_eq!(lead.arc_pct, Some(MetricValue::Missing));
        assert!(lead.has_dedupe_issue.is_none());
    }

    #[test]
    fn test_missing_data_is_skipped() {
        let mut acc = EventAccumulator::new();
        let outcome = AttributedConversionsMapper.apply(&mut acc, &arc(Value::Null));
        assert_eq!(outcome, Err(SkipReason::MissingPayloadData));
    }
}
