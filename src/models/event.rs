use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::validate;

/// The seven fixed life-category labels. Every event carries exactly one;
/// `Media` is the default when nothing else applies.
///
/// The declaration order is also the classifier's tie-break priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Economics,
    Education,
    Work,
    Health,
    Relationships,
    Travel,
    Media,
}

impl Layer {
    /// All layers in tie-break priority order (highest priority first).
    pub const ALL: [Layer; 7] = [
        Layer::Economics,
        Layer::Education,
        Layer::Work,
        Layer::Health,
        Layer::Relationships,
        Layer::Travel,
        Layer::Media,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Economics => "economics",
            Layer::Education => "education",
            Layer::Work => "work",
            Layer::Health => "health",
            Layer::Relationships => "relationships",
            Layer::Travel => "travel",
            Layer::Media => "media",
        }
    }
}

impl Default for Layer {
    fn default() -> Self {
        Layer::Media
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "economics" | "finance" | "money" => Ok(Layer::Economics),
            "education" | "learning" => Ok(Layer::Education),
            "work" | "career" => Ok(Layer::Work),
            "health" | "fitness" => Ok(Layer::Health),
            "relationships" | "social" | "family" => Ok(Layer::Relationships),
            "travel" => Ok(Layer::Travel),
            "media" | "entertainment" => Ok(Layer::Media),
            _ => Err(()),
        }
    }
}

/// Which front end produced an event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Csv,
    Calendar,
    Photo,
    Takeout,
    Social,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Csv => "csv",
            Source::Calendar => "calendar",
            Source::Photo => "photo",
            Source::Takeout => "takeout",
            Source::Social => "social",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated geographic position. Latitude and longitude are jointly
/// present or the whole location is absent; construction rejects
/// out-of-range pairs and the (0, 0) sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
}

impl GeoLocation {
    /// Returns None for coordinates that fail [`validate::valid_coords`].
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if !validate::valid_coords(lat, lon) {
            return None;
        }
        Some(Self { lat, lon, name: None, country: None, altitude_m: None })
    }

    /// A location carrying only a place name, no coordinates, is modeled as
    /// name-only metadata on the event instead; this constructor exists for
    /// callers that have a name alongside a valid fix.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }
}

/// Constraint violations that prevent an event from existing at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventConstraint {
    #[error("title is empty after sanitization")]
    EmptyTitle,
    #[error("start year {0} outside supported range")]
    StartOutOfRange(i32),
}

/// The one normalized record shape every parser converges to.
///
/// Instances only come out of [`CanonicalEvent::new`], which sanitizes and
/// validates, so a constructed event is always fully valid. Events are
/// immutable once emitted by the pipeline; edits and deduplication belong
/// to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    pub layer: Layer,
    pub event_type: String,
    pub source: Source,
    /// Stable per-source identifier for caller-side deduplication. Native
    /// when the export carries one, otherwise synthesized deterministically
    /// from source, start, and title.
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl CanonicalEvent {
    /// Create a validated event. The raw title is control-stripped, trimmed,
    /// and truncated; an empty result or an out-of-window start year is a
    /// constraint violation, not a partially valid event.
    pub fn new(
        user_id: &str,
        raw_title: &str,
        start: DateTime<Utc>,
        source: Source,
    ) -> Result<Self, EventConstraint> {
        let title = validate::clean_title(raw_title).ok_or(EventConstraint::EmptyTitle)?;
        if !validate::year_in_range(start.year()) {
            return Err(EventConstraint::StartOutOfRange(start.year()));
        }
        let source_id = synthesize_source_id(source, &start, &title);
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title,
            description: None,
            start,
            end: None,
            layer: Layer::default(),
            event_type: "imported".to_string(),
            source,
            source_id,
            location: None,
            media: Vec::new(),
            metadata: BTreeMap::new(),
        })
    }

    /// Attach a sanitized description; empty input clears it.
    pub fn with_description(mut self, raw: &str) -> Self {
        self.description = validate::clean_description(raw);
        self
    }

    /// Attach an end timestamp. Ends outside the year window are dropped
    /// rather than emitted invalid.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        if validate::year_in_range(end.year()) {
            self.end = Some(end);
        }
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    /// Replace the synthesized source id with the export's native one.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_media(mut self, media: Vec<String>) -> Self {
        self.media = media;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Deterministic fallback id: same input record, same id, across runs.
fn synthesize_source_id(source: Source, start: &DateTime<Utc>, title: &str) -> String {
    let slug: String = title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(32)
        .collect::<String>()
        .to_lowercase();
    format!("{}-{}-{}", source.as_str(), start.format("%Y%m%dT%H%M%S"), slug)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_title() {
        let err = CanonicalEvent::new("u1", "   ", ts(2021, 6, 5), Source::Csv).unwrap_err();
        assert_eq!(err, EventConstraint::EmptyTitle);
    }

    #[test]
    fn test_new_rejects_out_of_window_start() {
        let err = CanonicalEvent::new("u1", "Old", ts(1800, 1, 1), Source::Csv).unwrap_err();
        assert_eq!(err, EventConstraint::StartOutOfRange(1800));
    }

    #[test]
    fn test_new_truncates_long_title() {
        let long = "x".repeat(500);
        let ev = CanonicalEvent::new("u1", &long, ts(2021, 6, 5), Source::Csv).unwrap();
        assert_eq!(ev.title.chars().count(), validate::MAX_TITLE_CHARS);
        assert!(ev.title.ends_with('…'));
    }

    #[test]
    fn test_source_id_is_deterministic() {
        let a = CanonicalEvent::new("u1", "Dinner", ts(2021, 6, 5), Source::Csv).unwrap();
        let b = CanonicalEvent::new("u1", "Dinner", ts(2021, 6, 5), Source::Csv).unwrap();
        assert_eq!(a.source_id, b.source_id);
        assert_ne!(a.id, b.id); // identifiers themselves stay unique
    }

    #[test]
    fn test_with_end_drops_out_of_window() {
        let ev = CanonicalEvent::new("u1", "T", ts(2021, 6, 5), Source::Csv)
            .unwrap()
            .with_end(ts(2101, 1, 1));
        assert!(ev.end.is_none());
    }

    #[test]
    fn test_geo_location_rejects_invalid() {
        assert!(GeoLocation::new(0.0, 0.0).is_none());
        assert!(GeoLocation::new(95.0, 10.0).is_none());
        let loc = GeoLocation::new(48.85, 2.29).unwrap().with_name("Paris");
        assert_eq!(loc.name.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_layer_from_str_aliases() {
        assert_eq!("Finance".parse::<Layer>(), Ok(Layer::Economics));
        assert_eq!("travel".parse::<Layer>(), Ok(Layer::Travel));
        assert!("unknown".parse::<Layer>().is_err());
    }

    #[test]
    fn test_layer_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Layer::Relationships).unwrap(), "\"relationships\"");
        assert_eq!(serde_json::to_string(&Source::Photo).unwrap(), "\"photo\"");
    }
}
