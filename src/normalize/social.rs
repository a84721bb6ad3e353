//! Post/connection/event-style vendor export normalizer.
//!
//! Accepted shapes, resolved by structural probing:
//!
//! - **Posts**: a `posts`/`status_updates`/`wall_posts` array. Long free
//!   text truncates into the title while staying intact in the
//!   description; attachment media URIs become media references.
//! - **Connections**: a `friends`/`connections`/`contacts` array; each
//!   becomes a relationships event.
//! - **Events**: an `events`/`event_responses` array with optional place
//!   coordinates.
//!
//! One export object may carry several containers at once; each is
//! normalized independently and unrecognized top-level keys are ignored.

use serde_json::Value;

use crate::classify::{self, ClassifyOptions};
use crate::dates;
use crate::models::{CanonicalEvent, GeoLocation, ImportOptions, Layer, Source};
use crate::normalize::{array_alias, date_string, first_present, str_alias};
use crate::parsers::ParseOutcome;

const POST_ALIASES: &[&str] = &["posts", "status_updates", "wall_posts"];
const CONNECTION_ALIASES: &[&str] = &["friends", "connections", "contacts"];
const EVENT_ALIASES: &[&str] = &["events", "event_responses"];

/// Normalize one parsed export structure. None when nothing in it matches
/// a known container.
pub fn normalize(value: &Value, opts: &ImportOptions) -> Option<ParseOutcome> {
    let mut outcome = ParseOutcome::default();
    let mut matched = false;

    if let Some(posts) = array_alias(value, POST_ALIASES) {
        matched = true;
        posts_to_events(posts, opts, &mut outcome);
    }
    if let Some(connections) = array_alias(value, CONNECTION_ALIASES) {
        matched = true;
        connections_to_events(connections, opts, &mut outcome);
    }
    if let Some(events) = array_alias(value, EVENT_ALIASES) {
        matched = true;
        planned_to_events(events, opts, &mut outcome);
    }
    // Oldest layout: a bare array of post objects.
    if !matched
        && let Some(array) = value.as_array()
        && array.iter().any(|v| v.get("timestamp").is_some() && v.get("data").is_some())
    {
        matched = true;
        posts_to_events(array, opts, &mut outcome);
    }

    matched.then_some(outcome)
}

fn classify_opts(opts: &ImportOptions, location_populated: bool) -> ClassifyOptions {
    ClassifyOptions {
        extra_keywords: opts.extra_keywords.clone(),
        min_score: opts.min_score,
        location_populated,
    }
}

// --- Posts --------------------------------------------------------------

fn posts_to_events(posts: &[Value], opts: &ImportOptions, outcome: &mut ParseOutcome) {
    for post in posts {
        let Some(start) = first_present(post, &["timestamp", "created_time"])
            .and_then(date_string)
            .and_then(|s| dates::resolve(&s, opts.date_order))
        else {
            outcome.records_skipped += 1;
            continue;
        };
        let Some(text) = post_text(post) else {
            outcome.records_skipped += 1;
            continue;
        };

        // The title ceiling does the truncation; the description keeps the
        // full text.
        let event = match CanonicalEvent::new(&opts.user_id, text, start, Source::Social) {
            Ok(event) => event,
            Err(constraint) => {
                outcome.issues.push(format!("post dropped: {}", constraint));
                continue;
            }
        };
        let layer = classify::classify(text, &classify_opts(opts, false)).layer;
        let mut event = event
            .with_event_type("post")
            .with_layer(layer)
            .with_description(text);

        let media = attachment_uris(post);
        if !media.is_empty() {
            event = event.with_media(media);
        }

        outcome.events.push(event);
    }
}

/// Post text: the first `data[].post`-style entry, then the item title.
fn post_text(post: &Value) -> Option<&str> {
    if let Some(data) = post.get("data").and_then(Value::as_array) {
        for entry in data {
            if let Some(text) = str_alias(entry, &["post", "text"]) {
                return Some(text);
            }
        }
    }
    str_alias(post, &["title"])
}

fn attachment_uris(post: &Value) -> Vec<String> {
    let mut uris = Vec::new();
    let Some(attachments) = post.get("attachments").and_then(Value::as_array) else {
        return uris;
    };
    for attachment in attachments {
        let Some(data) = attachment.get("data").and_then(Value::as_array) else {
            continue;
        };
        for entry in data {
            if let Some(uri) = entry
                .get("media")
                .and_then(|m| str_alias(m, &["uri"]))
                .or_else(|| str_alias(entry, &["uri"]))
            {
                uris.push(uri.to_string());
            }
        }
    }
    uris
}

// --- Connections --------------------------------------------------------

fn connections_to_events(connections: &[Value], opts: &ImportOptions, outcome: &mut ParseOutcome) {
    for connection in connections {
        let Some(name) = str_alias(connection, &["name"]) else {
            outcome.records_skipped += 1;
            continue;
        };
        let Some(start) = first_present(connection, &["timestamp", "created_time"])
            .and_then(date_string)
            .and_then(|s| dates::resolve(&s, opts.date_order))
        else {
            outcome.records_skipped += 1;
            continue;
        };

        let title = format!("Connected with {}", name);
        match CanonicalEvent::new(&opts.user_id, &title, start, Source::Social) {
            Ok(event) => outcome.events.push(
                event.with_event_type("connection").with_layer(Layer::Relationships),
            ),
            Err(constraint) => {
                outcome.issues.push(format!("connection '{}': {}", name, constraint));
            }
        }
    }
}

// --- Planned events -----------------------------------------------------

fn planned_to_events(events: &[Value], opts: &ImportOptions, outcome: &mut ParseOutcome) {
    for item in events {
        let Some(name) = str_alias(item, &["name", "title"]) else {
            outcome.records_skipped += 1;
            continue;
        };
        let Some(start) = first_present(item, &["start_timestamp", "start_time"])
            .and_then(date_string)
            .and_then(|s| dates::resolve(&s, opts.date_order))
        else {
            outcome.records_skipped += 1;
            continue;
        };

        let event = match CanonicalEvent::new(&opts.user_id, name, start, Source::Social) {
            Ok(event) => event,
            Err(constraint) => {
                outcome.issues.push(format!("event '{}': {}", name, constraint));
                continue;
            }
        };
        let mut event = event.with_event_type("event");

        if let Some(end) = first_present(item, &["end_timestamp", "end_time"])
            .and_then(date_string)
            .and_then(|s| dates::resolve(&s, opts.date_order))
        {
            event = event.with_end(end);
        }

        let place = item.get("place");
        let place_name = place.and_then(|p| str_alias(p, &["name"]));
        let coordinate = place.and_then(place_coordinate);
        if let Some(name) = place_name {
            event = event.with_metadata("place", name);
        }

        let location = coordinate.and_then(|(lat, lon)| GeoLocation::new(lat, lon)).map(
            |loc| match place_name {
                Some(name) => loc.with_name(name),
                None => loc,
            },
        );
        let layer =
            classify::classify(name, &classify_opts(opts, location.is_some())).layer;
        event = event.with_layer(layer);
        if let Some(location) = location {
            event = event.with_location(location);
        }

        outcome.events.push(event);
    }
}

fn place_coordinate(place: &Value) -> Option<(f64, f64)> {
    let holder = first_present(place, &["location", "coordinate"])?;
    let lat = holder.get("latitude")?.as_f64()?;
    let lon = holder.get("longitude")?.as_f64()?;
    Some((lat, lon))
}
