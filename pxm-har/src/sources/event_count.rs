// Event Count Mapper
//
// Reads `new_har_event_count` captures: per-event hit timelines split by
// connection method. Browser (pixel) and server (CAPI) counts land on the
// same record, and the record recomputes the server-vs-browser gap whenever
// either side changes.

use super::{data_items, event_name, Applied, EntryOutcome, SkipReason, SourceKind, SourceMapper};
use crate::accumulator::EventAccumulator;
use crate::capture::RawCapture;
use crate::types::MetricValue;
use serde_json::Value;

/// Connection method of browser-only (pixel) hits
pub const WEB_ONLY: &str = "WEB_ONLY";

/// Connection method of server-only (conversions API) hits
pub const SERVER_ONLY: &str = "SERVER_ONLY";

/// Mapper for the event count export
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCountMapper;

impl SourceMapper for EventCountMapper {
    fn kind(&self) -> SourceKind {
        SourceKind::EventCount
    }

    fn apply(&self, acc: &mut EventAccumulator, capture: &RawCapture) -> EntryOutcome {
        let payload = capture
            .payload()
            .map_err(|_| SkipReason::UnparseablePayload)?;
        let items = data_items(&payload).ok_or(SkipReason::MissingPayloadData)?;

        let mut applied = Applied::default();
        for item in items {
            let Some((name, method, count)) = count_entry(item) else {
                applied.skipped_items.push(SkipReason::MalformedItem);
                continue;
            };

            let record = acc.record_mut(name);
            match method {
                WEB_ONLY => record.set_browser_hits(count),
                SERVER_ONLY => record.set_server_hits(count),
                // Other methods still register the event row
                _ => {}
            }
            applied.updates += 1;
        }

        Ok(applied)
    }
}

/// `(event name, connection method, count)` of one timeline entry
///
/// Shape: `{"keys": [name, method], "timeline": [[bucket, count], ...]}`.
/// The count must be a number.
fn count_entry(item: &Value) -> Option<(&str, &str, MetricValue)> {
    let keys = item.get("keys").and_then(Value::as_array)?;
    let name = event_name(keys.first())?;
    let method = keys
        .get(1)
        .and_then(Value::as_str)
        .filter(|method| !method.is_empty())?;
    let count = item.pointer("/timeline/0/1").filter(|count| count.is_number())?;
    Some((name, method, MetricValue::from_json(Some(count))))
}
