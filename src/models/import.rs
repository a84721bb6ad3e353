use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dates::DateOrder;
use crate::error::ImportError;
use crate::models::event::{CanonicalEvent, Layer};
use crate::validate;

/// Caller-supplied knobs. An import result is a pure function of the items
/// plus these options, so re-running with the same inputs reproduces the
/// same events and stats.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Owning-user identifier stamped on every event.
    pub user_id: String,
    /// Disambiguates slash/dash/dot dates (06/05/2021). Never guessed.
    pub date_order: DateOrder,
    /// Extra classifier keywords merged over the built-in table per call.
    pub extra_keywords: HashMap<Layer, Vec<String>>,
    /// Minimum classifier score before falling back to the default layer.
    pub min_score: u32,
    /// Byte ceiling applied to every item before parsing.
    pub max_item_bytes: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            date_order: DateOrder::MonthFirst,
            extra_keywords: HashMap::new(),
            min_score: 1,
            max_item_bytes: validate::MAX_ITEM_BYTES,
        }
    }
}

/// Raw payload of one import item. The caller performs all I/O and hands
/// the pipeline a fully materialized buffer; the pipeline never reads from
/// disk or network itself.
#[derive(Debug, Clone)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
    Json(Value),
}

impl Payload {
    /// Size used against the per-item ceiling. For already-parsed JSON this
    /// is an estimate from the serialized form.
    pub fn size(&self) -> usize {
        match self {
            Payload::Bytes(b) => b.len(),
            Payload::Text(t) => t.len(),
            Payload::Json(v) => v.to_string().len(),
        }
    }
}

/// Explicit routing hint, overriding name-based detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemHint {
    Csv,
    Calendar,
    Photo,
    VendorJson,
}

/// A named input item handed to the pipeline.
#[derive(Debug, Clone)]
pub struct ImportItem {
    pub name: String,
    pub payload: Payload,
    pub hint: Option<ItemHint>,
}

impl ImportItem {
    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), payload: Payload::Bytes(bytes), hint: None }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), payload: Payload::Text(text.into()), hint: None }
    }

    pub fn json(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), payload: Payload::Json(value), hint: None }
    }

    pub fn with_hint(mut self, hint: ItemHint) -> Self {
        self.hint = Some(hint);
        self
    }
}

/// Aggregate counters for one import run. Merging is an associative,
/// order-independent sum so per-item stats can be folded in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub submitted: usize,
    pub processed: usize,
    pub skipped: usize,
    pub events: usize,
    pub by_layer: BTreeMap<Layer, usize>,
}

impl ImportStats {
    pub fn record_event(&mut self, layer: Layer) {
        self.events += 1;
        *self.by_layer.entry(layer).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: ImportStats) {
        self.submitted += other.submitted;
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.events += other.events;
        for (layer, count) in other.by_layer {
            *self.by_layer.entry(layer).or_insert(0) += count;
        }
    }
}

/// The sole externally visible output of any entry point: the events that
/// survived, the non-fatal errors accumulated along the way, and the
/// aggregate counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub events: Vec<CanonicalEvent>,
    pub errors: Vec<ImportError>,
    pub stats: ImportStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_merge_is_associative() {
        let mut a = ImportStats { submitted: 1, processed: 1, ..Default::default() };
        a.record_event(Layer::Travel);

        let mut b = ImportStats { submitted: 2, skipped: 1, ..Default::default() };
        b.record_event(Layer::Travel);
        b.record_event(Layer::Media);

        let mut left = a.clone();
        left.merge(b.clone());

        let mut right = b;
        right.merge(a);

        assert_eq!(left, right);
        assert_eq!(left.events, 3);
        assert_eq!(left.by_layer[&Layer::Travel], 2);
    }

    #[test]
    fn test_payload_size() {
        assert_eq!(Payload::Text("abcd".to_string()).size(), 4);
        assert_eq!(Payload::Bytes(vec![0u8; 10]).size(), 10);
    }

    #[test]
    fn test_default_options() {
        let opts = ImportOptions::default();
        assert_eq!(opts.min_score, 1);
        assert_eq!(opts.max_item_bytes, validate::MAX_ITEM_BYTES);
        assert_eq!(opts.date_order, DateOrder::MonthFirst);
    }
}
