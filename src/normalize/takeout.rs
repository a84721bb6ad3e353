//! Location/calendar/notes-style vendor export normalizer.
//!
//! Accepted shapes, resolved by structural probing:
//!
//! - **Location history**: a `locations` array of GPS fixes. Fixes are
//!   grouped by calendar day into one travel event per day - not one per
//!   fix - keeping the point count and a representative coordinate.
//! - **Calendar items**: an `events`/`calendarItems`/`items` array; items
//!   without a native category are classified from their text.
//! - **Notes**: a `notes` array (or a bare array of note objects).
//!   Checklists render into one description with a checked/unchecked
//!   marker per line; trashed notes are excluded; the last-edited
//!   timestamp is preferred over creation time.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::classify::{self, ClassifyOptions};
use crate::dates;
use crate::models::{CanonicalEvent, GeoLocation, ImportOptions, Layer, Source};
use crate::normalize::{array_alias, date_string, first_present, str_alias};
use crate::parsers::ParseOutcome;

const LOCATION_ALIASES: &[&str] = &["locations", "Locations"];
const CALENDAR_ALIASES: &[&str] = &["events", "calendarItems", "items"];
const NOTE_ALIASES: &[&str] = &["notes"];

/// The closed set of shapes this normalizer accepts.
enum Shape<'a> {
    Locations(&'a [Value]),
    CalendarItems(&'a [Value]),
    Notes(&'a [Value]),
}

fn probe(value: &Value) -> Option<Shape<'_>> {
    if let Some(fixes) = array_alias(value, LOCATION_ALIASES) {
        return Some(Shape::Locations(fixes));
    }
    if let Some(items) = array_alias(value, CALENDAR_ALIASES) {
        return Some(Shape::CalendarItems(items));
    }
    if let Some(notes) = array_alias(value, NOTE_ALIASES) {
        return Some(Shape::Notes(notes));
    }
    // A bare top-level array of note-shaped objects is the oldest export
    // layout for notes.
    if let Some(array) = value.as_array()
        && array.iter().any(|v| {
            v.get("textContent").is_some()
                || v.get("listContent").is_some()
                || v.get("userEditedTimestampUsec").is_some()
        })
    {
        return Some(Shape::Notes(array));
    }
    None
}

/// Normalize one parsed export structure. None means the structure matches
/// no known shape; the caller decides whether that is a format error.
pub fn normalize(value: &Value, opts: &ImportOptions) -> Option<ParseOutcome> {
    match probe(value)? {
        Shape::Locations(fixes) => Some(locations_to_events(fixes, opts)),
        Shape::CalendarItems(items) => Some(calendar_items_to_events(items, opts)),
        Shape::Notes(notes) => Some(notes_to_events(notes, opts)),
    }
}

// --- Location history ---------------------------------------------------

struct Fix {
    at: DateTime<Utc>,
    lat: f64,
    lon: f64,
}

fn locations_to_events(fixes: &[Value], opts: &ImportOptions) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    // BTreeMap keeps the day grouping deterministic.
    let mut by_day: BTreeMap<NaiveDate, Vec<Fix>> = BTreeMap::new();

    for raw in fixes {
        let Some(fix) = read_fix(raw, opts) else {
            outcome.records_skipped += 1;
            continue;
        };
        by_day.entry(fix.at.date_naive()).or_default().push(fix);
    }

    for (day, mut day_fixes) in by_day {
        day_fixes.sort_by_key(|f| f.at);
        let (Some(first), Some(last)) = (day_fixes.first(), day_fixes.last()) else {
            continue;
        };
        let title = format!("Travel on {}", day.format("%Y-%m-%d"));

        let event = match CanonicalEvent::new(&opts.user_id, &title, first.at, Source::Takeout) {
            Ok(event) => event,
            Err(constraint) => {
                outcome.issues.push(format!("location day {}: {}", day, constraint));
                continue;
            }
        };
        // Median fix by index: a stable representative coordinate without
        // averaging artifacts.
        let median = &day_fixes[day_fixes.len() / 2];
        let mut event = event
            .with_layer(Layer::Travel)
            .with_event_type("travel-day")
            .with_metadata("point_count", day_fixes.len().to_string());
        if last.at > first.at {
            event = event.with_end(last.at);
        }
        if let Some(location) = GeoLocation::new(median.lat, median.lon) {
            event = event.with_location(location);
        }
        outcome.events.push(event);
    }

    outcome
}

/// One GPS fix: timestamp (`timestampMs` epoch-ms or `timestamp` ISO) plus
/// degree coordinates scaled by 1e7. Anything incomplete or out of range
/// is not a fix.
fn read_fix(raw: &Value, opts: &ImportOptions) -> Option<Fix> {
    let at = first_present(raw, &["timestampMs", "timestamp"])
        .and_then(date_string)
        .and_then(|s| dates::resolve(&s, opts.date_order))?;
    let lat = e7_coord(raw, "latitudeE7")?;
    let lon = e7_coord(raw, "longitudeE7")?;
    crate::validate::valid_coords(lat, lon).then_some(Fix { at, lat, lon })
}

fn e7_coord(raw: &Value, key: &str) -> Option<f64> {
    Some(raw.get(key)?.as_i64()? as f64 / 1e7)
}

// --- Calendar items -----------------------------------------------------

fn calendar_items_to_events(items: &[Value], opts: &ImportOptions) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for item in items {
        let Some(title) = str_alias(item, &["title", "summary", "name"]) else {
            outcome.records_skipped += 1;
            continue;
        };
        let start = dates::best_of(
            [
                str_alias(item, &["startTime"]),
                str_alias(item, &["start"]),
                str_alias(item, &["date"]),
            ],
            opts.date_order,
        );
        let Some(start) = start else {
            outcome.records_skipped += 1;
            continue;
        };

        let event = match CanonicalEvent::new(&opts.user_id, title, start, Source::Takeout) {
            Ok(event) => event,
            Err(constraint) => {
                outcome.issues.push(format!("calendar item '{}': {}", title, constraint));
                continue;
            }
        };
        let mut event = event.with_event_type("event");

        let description = str_alias(item, &["description", "notes"]);
        if let Some(desc) = description {
            event = event.with_description(desc);
        }
        if let Some(end) =
            dates::best_of([str_alias(item, &["endTime"]), str_alias(item, &["end"])], opts.date_order)
        {
            event = event.with_end(end);
        }
        if let Some(id) = str_alias(item, &["id", "uid"]) {
            event = event.with_source_id(id);
        }

        let location_name = str_alias(item, &["location", "place"]);
        if let Some(name) = location_name {
            event = event.with_metadata("location", name);
        }

        // Native category wins; otherwise classify from the item's text,
        // with the location bonus when a place is present.
        let native = str_alias(item, &["category", "layer"]).and_then(|c| c.parse::<Layer>().ok());
        let layer = native.unwrap_or_else(|| {
            let classify_opts = ClassifyOptions {
                extra_keywords: opts.extra_keywords.clone(),
                min_score: opts.min_score,
                location_populated: location_name.is_some(),
            };
            classify::classify_fields(&[title, description.unwrap_or("")], &classify_opts).layer
        });
        event = event.with_layer(layer);

        outcome.events.push(event);
    }

    outcome
}

// --- Notes --------------------------------------------------------------

fn notes_to_events(notes: &[Value], opts: &ImportOptions) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for note in notes {
        if note.get("isTrashed").and_then(Value::as_bool) == Some(true) {
            outcome.records_skipped += 1;
            continue;
        }

        let body = note_body(note);
        let title = str_alias(note, &["title"])
            .map(str::to_string)
            .or_else(|| body.as_deref().and_then(first_line));
        let Some(title) = title else {
            outcome.records_skipped += 1;
            continue;
        };

        // Last-edited beats created when both are present.
        let start = dates::best_of(
            [
                usec_string(note, "userEditedTimestampUsec").as_deref(),
                str_alias(note, &["editedTimestamp"]),
                usec_string(note, "createdTimestampUsec").as_deref(),
                str_alias(note, &["createdTimestamp"]),
            ],
            opts.date_order,
        );
        let Some(start) = start else {
            outcome.records_skipped += 1;
            continue;
        };

        let event = match CanonicalEvent::new(&opts.user_id, &title, start, Source::Takeout) {
            Ok(event) => event,
            Err(constraint) => {
                outcome.issues.push(format!("note dropped: {}", constraint));
                continue;
            }
        };
        let classify_opts = ClassifyOptions {
            extra_keywords: opts.extra_keywords.clone(),
            min_score: opts.min_score,
            location_populated: false,
        };
        let layer = classify::classify_fields(
            &[title.as_str(), body.as_deref().unwrap_or("")],
            &classify_opts,
        )
        .layer;
        let mut event = event.with_event_type("note").with_layer(layer);
        if let Some(body) = &body {
            event = event.with_description(body);
        }
        outcome.events.push(event);
    }

    outcome
}

/// Note content: free text, or a checklist rendered one line per entry
/// with a consistent checked/unchecked marker.
fn note_body(note: &Value) -> Option<String> {
    if let Some(text) = str_alias(note, &["textContent", "text"]) {
        return Some(text.to_string());
    }
    let list = note.get("listContent")?.as_array()?;
    let lines: Vec<String> = list
        .iter()
        .filter_map(|entry| {
            let text = str_alias(entry, &["text"])?;
            let checked = entry.get("isChecked").and_then(Value::as_bool).unwrap_or(false);
            Some(format!("{} {}", if checked { "[x]" } else { "[ ]" }, text))
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn first_line(text: &str) -> Option<String> {
    text.lines().map(str::trim).find(|l| !l.is_empty()).map(str::to_string)
}

/// Epoch-microsecond fields are older than the millisecond dialect the
/// date table knows; scale them down here.
fn usec_string(obj: &Value, key: &str) -> Option<String> {
    let micros = obj.get(key)?.as_i64().or_else(|| obj.get(key)?.as_str()?.parse().ok())?;
    Some((micros / 1000).to_string())
}
