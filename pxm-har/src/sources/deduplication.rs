// Deduplication Mapper
//
// Reads `deduplication` captures: server/browser coverage and overlap of the
// three dedupe keys. The statistics block moves around between API
// versions, so it is located through an ordered list of lookup paths.

use super::{event_name, Applied, EntryOutcome, SkipReason, SourceKind, SourceMapper};
use crate::accumulator::EventAccumulator;
use crate::capture::RawCapture;
use crate::types::{DedupeKey, MetricValue};
use serde_json::Value;

/// JSON pointers (relative to `payload`) tried in order for dedupe key stats
pub const DEDUPE_KEY_STATS_PATHS: [&str; 3] = [
    "/dedupeKeyStats",
    "/data/dedupe/dedupeKeyStats",
    "/dataWithBreakDown/breakdownData/overall/dedupe/dedupeKeyStats",
];

/// Mapper for the deduplication export
#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicationMapper;

impl SourceMapper for DeduplicationMapper {
    fn kind(&self) -> SourceKind {
        SourceKind::Deduplication
    }

    fn apply(&self, acc: &mut EventAccumulator, capture: &RawCapture) -> EntryOutcome {
        let payload = capture
            .payload()
            .map_err(|_| SkipReason::UnparseablePayload)?;
        let body = payload.get("payload").filter(|body| body.is_object());

        let name = body
            .and_then(|b| event_name(b.get("eventName")).or_else(|| event_name(b.get("event_name"))))
            .map(str::to_string)
            .or_else(|| capture.query_param("event_name"))
            .ok_or(SkipReason::MissingEventName)?;

        let stats = body.and_then(locate_dedupe_key_stats);
        let record = acc.record_mut(&name);

        for key in DedupeKey::ALL {
            let slot = record.identifier_mut(key);
            match stats.and_then(|stats| stat_for(stats, key)) {
                Some(stat) => {
                    slot.server_coverage = Some(MetricValue::from_json(stat.get("serverCoverage")));
                    slot.browser_coverage = Some(MetricValue::from_json(stat.get("browserCoverage")));
                    match stat.get("overlap").filter(|overlap| !overlap.is_null()) {
                        Some(overlap) => slot.overlap = Some(MetricValue::from_json(Some(overlap))),
                        None => {
                            slot.overlap.get_or_insert(MetricValue::Missing);
                        }
                    }
                }
                None => {
                    slot.overlap.get_or_insert(MetricValue::Missing);
                }
            }
        }

        Ok(Applied::single())
    }
}

/// First non-null dedupe key statistics block, in `DEDUPE_KEY_STATS_PATHS` order
pub fn locate_dedupe_key_stats(payload: &Value) -> Option<&Value> {
    DEDUPE_KEY_STATS_PATHS
        .iter()
        .find_map(|path| payload.pointer(path).filter(|stats| !stats.is_null()))
}

/// Statistics entry for one key
///
/// Accepts a list of entries tagged with `dedupeKey` or a map keyed by
/// identifier name.
pub fn stat_for(stats: &Value, key: DedupeKey) -> Option<&Value> {
    let stat = match stats {
        Value::Array(entries) => entries
            .iter()
            .find(|entry| entry.get("dedupeKey").and_then(Value::as_str) == Some(key.as_str())),
        Value::Object(map) => map.get(key.as_str()),
        _ => None,
    };
    stat.filter(|stat| stat.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dedupe(url: Option<&str>, payload: Value) -> RawCapture {
        RawCapture::new(url, format!("for (;;);{}", json!({ "payload": payload })))
    }

    #[test]
    fn test_lookup_priority() {
        let payload = json!({
            "dedupeKeyStats": [{"dedupeKey": "fbp", "overlap": 1}],
            "data": {"dedupe": {"dedupeKeyStats": [{"dedupeKey": "fbp", "overlap": 2}]}}
        });
        let stats = locate_dedupe_key_stats(&payload).unwrap();
        assert_eq!(stat_for(stats, DedupeKey::Fbp).unwrap()["overlap"], json!(1));

        let nested = json!({
            "dedupeKeyStats": null,
            "dataWithBreakDown": {"breakdownData": {"overall": {"dedupe": {
                "dedupeKeyStats": {"event_id": {"overlap": 3}}
            }}}}
        });
        let stats = locate_dedupe_key_stats(&nested).unwrap();
        assert_eq!(stat_for(stats, DedupeKey::EventId).unwrap()["overlap"], json!(3));

        assert!(locate_dedupe_key_stats(&json!({"data": {}})).is_none());
    }

    #[test]
    fn test_list_and_map_shapes() {
        let list = json!([{"dedupeKey": "external_id", "serverCoverage": 40}, "junk"]);
        let map = json!({"external_id": {"serverCoverage": 40}, "fbp": 5});

        assert!(stat_for(&list, DedupeKey::ExternalId).is_some());
        assert!(stat_for(&map, DedupeKey::ExternalId).is_some());
        assert!(stat_for(&map, DedupeKey::Fbp).is_none());
        assert!(stat_for(&json!("nope"), DedupeKey::Fbp).is_none());
    }

    #[test]
    fn test_coverage_and_overlap() {
        let mut acc = EventAccumulator::new();
        DeduplicationMapper
            .apply(
                &mut acc,
                &dedupe(
                    None,
                    json!({
                        "eventName": "Purchase",
                        "dedupeKeyStats": [
                            {"dedupeKey": "event_id", "serverCoverage": 98.1, "browserCoverage": 99, "overlap": 95},
                            {"dedupeKey": "fbp", "serverCoverage": 60, "overlap": null}
                        ]
                    }),
                ),
            )
            .unwrap();

        let record = acc.get("Purchase").unwrap();
        assert_eq!(record.event_id.overlap, Some(MetricValue::from(95)));
        assert_eq!(record.event_id.server_coverage, Some(MetricValue::from(98.1)));
        assert_eq!(record.fbp.server_coverage, Some(MetricValue::from(60)));
        assert_eq!(record.fbp.browser_coverage, Some(MetricValue::Missing));
        assert_eq!(record.fbp.overlap, Some(MetricValue::Missing));
        assert!(record.external_id.server_coverage.is_none());
        assert_eq!(record.external_id.overlap, Some(MetricValue::Missing));
    }

    #[test]
    fn test_null_overlap_never_overwrites() {
        let mut acc = EventAccumulator::new();
        let with_overlap = dedupe(
            None,
            json!({"event_name": "Lead", "dedupeKeyStats": {"fbp": {"overlap": 72.5}}}),
        );
        let without_overlap = dedupe(
            None,
            json!({"event_name": "Lead", "dedupeKeyStats": {"fbp": {"overlap": null, "serverCoverage": 10}}}),
        );

        DeduplicationMapper.apply(&mut acc, &with_overlap).unwrap();
        DeduplicationMapper.apply(&mut acc, &without_overlap).unwrap();

        let record = acc.get("Lead").unwrap();
        assert_eq!(record.fbp.overlap, Some(MetricValue::from(72.5)));
        assert_eq!(record.fbp.server_coverage, Some(MetricValue::from(10)));
    }

    #[test]
    fn test_capture_without_stats_keeps_earlier_values() {
        let mut acc = EventAccumulator::new();
        DeduplicationMapper
            .apply(
                &mut acc,
                &dedupe(
                    None,
                    json!({"eventName": "Lead", "dedupeKeyStats": [
                        {"dedupeKey": "fbp", "serverCoverage": 60, "browserCoverage": 55, "overlap": 40}
                    ]}),
                ),
            )
            .unwrap();
        DeduplicationMapper
            .apply(&mut acc, &dedupe(None, json!({"eventName": "Lead"})))
            .unwrap();

        let record = acc.get("Lead").unwrap();
        assert_eq!(record.fbp.server_coverage, Some(MetricValue::from(60)));
        assert_eq!(record.fbp.browser_coverage, Some(MetricValue::from(55)));
        assert_eq!(record.fbp.overlap, Some(MetricValue::from(40)));
    }

    #[test]
    fn test_real_overlap_replaces_sentinel() {
        let mut acc = EventAccumulator::new();
        DeduplicationMapper
            .apply(&mut acc, &dedupe(None, json!({"eventName": "Lead"})))
            .unwrap();
        assert_eq!(acc.get("Lead").unwrap().fbp.overlap, Some(MetricValue::Missing));

        DeduplicationMapper
            .apply(
                &mut acc,
                &dedupe(None, json!({"eventName": "Lead", "dedupeKeyStats": {"fbp": {"overlap": 40}}})),
            )
            .unwrap();
        assert_eq!(acc.get("Lead").unwrap().fbp.overlap, Some(MetricValue::from(40)));
    }

    #[test]
    fn test_event_name_fallbacks() {
        let mut acc = EventAccumulator::new();
        DeduplicationMapper
            .apply(
                &mut acc,
                &dedupe(Some("https://ads.example.com/dedupe?id=1&event_name=CompleteRegistration"), json!({})),
            )
            .unwrap();
        assert!(acc.get("CompleteRegistration").is_some());

        let outcome = DeduplicationMapper.apply(&mut acc, &dedupe(None, json!({"eventName": ""})));
        assert_eq!(outcome, Err(SkipReason::MissingEventName));
    }
}
