// Per-Source Field Mappers
//
// One mapper per HAR export. Each folds its file's captures into the shared
// accumulator and reports one outcome per capture, so skipped captures are
// counted rather than silently dropped.

pub mod attributed_conversions;
pub mod deduplication;
pub mod event_count;
pub mod setup_quality;

use crate::accumulator::EventAccumulator;
use crate::capture::{HarDocument, RawCapture};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

pub use attributed_conversions::AttributedConversionsMapper;
pub use deduplication::DeduplicationMapper;
pub use event_count::EventCountMapper;
pub use setup_quality::SetupQualityMapper;

/// The four HAR exports, in fold order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SourceKind {
    #[serde(rename = "setup_quality")]
    SetupQuality,
    #[serde(rename = "new_har_event_count")]
    EventCount,
    #[serde(rename = "additional_attributed_conversions")]
    AttributedConversions,
    #[serde(rename = "deduplication")]
    Deduplication,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::SetupQuality,
        SourceKind::EventCount,
        SourceKind::AttributedConversions,
        SourceKind::Deduplication,
    ];

    /// Substring identifying this export in a file name
    pub fn base_name(self) -> &'static str {
        match self {
            Self::SetupQuality => "setup_quality",
            Self::EventCount => "new_har_event_count",
            Self::AttributedConversions => "additional_attributed_conversions",
            Self::Deduplication => "deduplication",
        }
    }

    /// First kind whose base name occurs in `file_name`
    pub fn classify(file_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| file_name.contains(kind.base_name()))
    }

    pub fn mapper(self) -> &'static dyn SourceMapper {
        match self {
            Self::SetupQuality => &SetupQualityMapper,
            Self::EventCount => &EventCountMapper,
            Self::AttributedConversions => &AttributedConversionsMapper,
            Self::Deduplication => &DeduplicationMapper,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_name())
    }
}

/// Why a capture (or one item inside it) contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// HAR entry has the wrong shape (e.g. non-string URL)
    MalformedEntry,
    /// Response body empty or not JSON after prefix stripping
    UnparseablePayload,
    /// Payload lacks the data section this source reads
    MissingPayloadData,
    /// Neither payload nor URL names an event
    MissingEventName,
    /// A list item lacks a required sub-field
    MalformedItem,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MalformedEntry => "malformed entry",
            Self::UnparseablePayload => "unparseable payload",
            Self::MissingPayloadData => "missing payload data",
            Self::MissingEventName => "missing event name",
            Self::MalformedItem => "malformed item",
        };
        f.write_str(text)
    }
}

/// What one applied capture contributed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    /// Record updates made (one per event touched)
    pub updates: usize,
    /// Items inside the capture that were skipped
    pub skipped_items: Vec<SkipReason>,
}

impl Applied {
    pub fn single() -> Self {
        Self {
            updates: 1,
            skipped_items: Vec::new(),
        }
    }
}

/// Per-capture result: applied, or skipped with a reason
pub type EntryOutcome = Result<Applied, SkipReason>;

/// Aggregated outcomes of one mapper over one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub source: SourceKind,
    /// Captures in the file
    pub entries: usize,
    /// Captures accepted by the mapper, including ones whose items were
    /// all skipped; `updates` counts what actually reached the accumulator
    pub applied: usize,
    /// Record updates across all applied captures
    pub updates: usize,
    /// Skipped captures by reason
    pub skipped: BTreeMap<SkipReason, usize>,
    /// Skipped list items (inside applied captures) by reason
    pub skipped_items: BTreeMap<SkipReason, usize>,
}

impl IngestSummary {
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            entries: 0,
            applied: 0,
            updates: 0,
            skipped: BTreeMap::new(),
            skipped_items: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, outcome: &EntryOutcome) {
        self.entries += 1;
        match outcome {
            Ok(applied) => {
                self.applied += 1;
                self.updates += applied.updates;
                for reason in &applied.skipped_items {
                    *self.skipped_items.entry(*reason).or_default() += 1;
                }
            }
            Err(reason) => *self.skipped.entry(*reason).or_default() += 1,
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn skipped_items_for(&self, reason: SkipReason) -> usize {
        self.skipped_items.get(&reason).copied().unwrap_or(0)
    }
}

/// A per-source field mapper
///
/// Mappers are stateless; `fold` threads the accumulator through, making
/// each source a function `(accumulator, file) -> accumulator`.
pub trait SourceMapper: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Apply one capture
    ///
    /// Implementations must decide to skip before mutating the accumulator.
    fn apply(&self, acc: &mut EventAccumulator, capture: &RawCapture) -> EntryOutcome;

    /// Fold every capture of `doc` into `acc`
    fn fold(&self, mut acc: EventAccumulator, doc: &HarDocument) -> (EventAccumulator, IngestSummary) {
        let mut summary = IngestSummary::new(self.kind());

        for (index, entry) in doc.entries().iter().enumerate() {
            let outcome = match RawCapture::from_entry(entry) {
                Ok(capture) => self.apply(&mut acc, &capture),
                Err(_) => Err(SkipReason::MalformedEntry),
            };
            if let Err(reason) = &outcome {
                debug!(source = %self.kind(), index, %reason, "Skipping capture");
            }
            summary.record(&outcome);
        }

        debug!(
            source = %self.kind(),
            entries = summary.entries,
            applied = summary.applied,
            skipped = summary.skipped_total(),
            "Source folded"
        );

        (acc, summary)
    }
}

/// Non-empty string event name
pub(crate) fn event_name(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|name| !name.is_empty())
}

/// JavaScript-style truthiness of an optional payload value
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0 && !v.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `payload.data` as a list of items
pub(crate) fn data_items(payload: &Value) -> Option<&Vec<Value>> {
    payload.pointer("/payload/data").and_then(Value::as_array)
}
