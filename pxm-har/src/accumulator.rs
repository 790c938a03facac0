//! Event accumulator
//!
//! Partial per-event records keyed by event name. Mappers only ever touch
//! a record through [`EventAccumulator::record_mut`], which creates it on
//! first sight; records are never replaced, so the first-appearance order
//! of keys is the output order of the finished table.

use crate::types::{round2, DedupeKey, EventKey, MetricValue};
use indexmap::IndexMap;

/// Threshold (in percent) above which a server/browser gap is flagged
pub const DIFF_ACCEPTABLE_PCT: f64 = 25.0;

/// Visual class of a server-vs-browser difference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffIndicator {
    /// |diff| <= 25%
    Acceptable,
    /// Server reports more than 25% above browser
    ServerAhead,
    /// Server reports more than 25% below browser
    ServerBehind,
}

impl DiffIndicator {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Acceptable => "✅",
            Self::ServerAhead => "📈",
            Self::ServerBehind => "📉",
        }
    }
}

/// Relative difference of server hits against browser hits, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerBrowserDiff {
    /// Rounded to two decimals
    pub pct: f64,
}

impl ServerBrowserDiff {
    /// `round(((server - browser) / browser) * 100, 2)`; `None` unless browser > 0
    pub fn compute(browser_hits: f64, server_hits: f64) -> Option<Self> {
        if browser_hits.is_nan() || browser_hits <= 0.0 || !server_hits.is_finite() {
            return None;
        }
        let pct = round2((server_hits - browser_hits) / browser_hits * 100.0);
        Some(Self { pct })
    }

    pub fn indicator(&self) -> DiffIndicator {
        if self.pct.abs() > DIFF_ACCEPTABLE_PCT {
            if self.pct > 0.0 {
                DiffIndicator::ServerAhead
            } else {
                DiffIndicator::ServerBehind
            }
        } else {
            DiffIndicator::Acceptable
        }
    }

    /// Table text, e.g. `"-25%"` followed by the indicator glyph
    pub fn render(&self) -> String {
        format!("{}% {}", self.pct, self.indicator().glyph())
    }
}

/// Coverage/overlap statistics for one dedupe identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifierStats {
    pub server_coverage: Option<MetricValue>,
    pub browser_coverage: Option<MetricValue>,
    pub overlap: Option<MetricValue>,
}

/// Event record under construction
///
/// `None` means no source has written the field yet; the finalizer turns it
/// into the sentinel. `Some(MetricValue::Missing)` means a source looked and
/// found nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialEventRecord {
    pub event_name: EventKey,
    pub composite_score: Option<MetricValue>,
    pub emq_rating: Option<MetricValue>,
    browser_hits: Option<MetricValue>,
    server_hits: Option<MetricValue>,
    diff: Option<ServerBrowserDiff>,
    pub arc_pct: Option<MetricValue>,
    pub has_dedupe_issue: Option<MetricValue>,
    pub event_id: IdentifierStats,
    pub external_id: IdentifierStats,
    pub fbp: IdentifierStats,
    /// Per-identifier columns discovered at runtime, in discovery order
    pub dynamic: IndexMap<String, MetricValue>,
}

impl PartialEventRecord {
    pub fn new(event_name: impl Into<EventKey>) -> Self {
        Self {
            event_name: event_name.into(),
            ..Default::default()
        }
    }

    pub fn browser_hits(&self) -> Option<&MetricValue> {
        self.browser_hits.as_ref()
    }

    pub fn server_hits(&self) -> Option<&MetricValue> {
        self.server_hits.as_ref()
    }

    pub fn diff(&self) -> Option<ServerBrowserDiff> {
        self.diff
    }

    /// Set browser hits and refresh the derived diff
    pub fn set_browser_hits(&mut self, hits: MetricValue) {
        self.browser_hits = Some(hits);
        self.refresh_diff();
    }

    /// Set server hits and refresh the derived diff
    pub fn set_server_hits(&mut self, hits: MetricValue) {
        self.server_hits = Some(hits);
        self.refresh_diff();
    }

    /// Recompute the diff from whatever hit counts are present now
    fn refresh_diff(&mut self) {
        if let (Some(browser), Some(server)) = (&self.browser_hits, &self.server_hits) {
            self.diff = match (browser.as_f64(), server.as_f64()) {
                (Some(b), Some(s)) => ServerBrowserDiff::compute(b, s),
                _ => None,
            };
        }
    }

    pub fn identifier(&self, key: DedupeKey) -> &IdentifierStats {
        match key {
            DedupeKey::EventId => &self.event_id,
            DedupeKey::ExternalId => &self.external_id,
            DedupeKey::Fbp => &self.fbp,
        }
    }

    pub fn identifier_mut(&mut self, key: DedupeKey) -> &mut IdentifierStats {
        match key {
            DedupeKey::EventId => &mut self.event_id,
            DedupeKey::ExternalId => &mut self.external_id,
            DedupeKey::Fbp => &mut self.fbp,
        }
    }

    /// Insert or overwrite a dynamic column, keeping its first position
    pub fn set_dynamic(&mut self, column: impl Into<String>, value: MetricValue) {
        self.dynamic.insert(column.into(), value);
    }
}

/// Event name → partial record, in first-appearance order
#[derive(Debug, Clone, Default)]
pub struct EventAccumulator {
    records: IndexMap<EventKey, PartialEventRecord>,
}

impl EventAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `event_name`, created on first sight
    pub fn record_mut(&mut self, event_name: &str) -> &mut PartialEventRecord {
        self.records
            .entry(event_name.to_string())
            .or_insert_with(|| PartialEventRecord::new(event_name))
    }

    pub fn get(&self, event_name: &str) -> Option<&PartialEventRecord> {
        self.records.get(event_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn into_records(self) -> impl Iterator<Item = PartialEventRecord> {
        self.records.into_values()
    }
}
