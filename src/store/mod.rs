//! The persistence seam.
//!
//! Durable storage is an external collaborator consumed only through this
//! narrow contract: insert, query by layer/source/date range, count,
//! clear. The pipeline never touches a store itself - it hands its event
//! list to whichever implementation the caller wires in. [`MemoryStore`]
//! backs the CLI and tests.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::{CanonicalEvent, Layer, Source};

/// Filter for [`EventStore::query`]. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub layer: Option<Layer>,
    pub source: Option<Source>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn matches(&self, event: &CanonicalEvent) -> bool {
        if let Some(layer) = self.layer
            && event.layer != layer
        {
            return false;
        }
        if let Some(source) = self.source
            && event.source != source
        {
            return false;
        }
        if let Some(from) = self.from
            && event.start < from
        {
            return false;
        }
        if let Some(to) = self.to
            && event.start > to
        {
            return false;
        }
        true
    }
}

pub trait EventStore {
    fn insert_batch(&mut self, events: Vec<CanonicalEvent>) -> Result<usize>;
    fn query(&self, query: &EventQuery) -> Result<Vec<CanonicalEvent>>;
    fn count(&self) -> Result<usize>;
    fn clear(&mut self) -> Result<()>;
}

/// In-memory store, ordered by start time.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Vec<CanonicalEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryStore {
    fn insert_batch(&mut self, events: Vec<CanonicalEvent>) -> Result<usize> {
        let inserted = events.len();
        self.events.extend(events);
        self.events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
        Ok(inserted)
    }

    fn query(&self, query: &EventQuery) -> Result<Vec<CanonicalEvent>> {
        Ok(self.events.iter().filter(|e| query.matches(e)).cloned().collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.events.len())
    }

    fn clear(&mut self) -> Result<()> {
        self.events.clear();
        Ok(())
    }
}
