//! Line-oriented calendar-text parser.
//!
//! Physical lines are unfolded first: a leading space or tab continues the
//! previous logical line with the indicator stripped and nothing inserted.
//! Each logical line then splits at the first unescaped colon into
//! name(+parameters) and value; `\n` `\,` `\;` `\\` unescape inside values.
//!
//! Records live between `BEGIN:VEVENT` and `END:VEVENT`. An unclosed
//! record at end of input, or a `BEGIN` while a record is already open,
//! discards the open record entirely - partial records are never emitted.
//! Recurrence rules, category lists, attendee/organizer addresses, and
//! status are captured verbatim in metadata, never interpreted or
//! expanded.

use thiserror::Error;

use crate::dates;
use crate::models::{CanonicalEvent, ImportOptions, Source};
use crate::parsers::ParseOutcome;

/// Properties stored verbatim in event metadata, uninterpreted.
const VERBATIM_PROPERTIES: &[&str] = &["RRULE", "CATEGORIES", "ATTENDEE", "ORGANIZER", "STATUS"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },
}

/// One record under construction between BEGIN and END markers.
#[derive(Debug, Default)]
struct EventDraft {
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    uid: Option<String>,
    dtstart: Option<String>,
    dtend: Option<String>,
    metadata: Vec<(String, String)>,
}

/// Parse calendar text into events.
///
/// The byte ceiling is enforced before any parsing; everything after that
/// is per-record, so one malformed record never affects its siblings.
pub fn parse(text: &str, opts: &ImportOptions) -> Result<ParseOutcome, CalendarError> {
    if text.len() > opts.max_item_bytes {
        return Err(CalendarError::TooLarge { size: text.len(), limit: opts.max_item_bytes });
    }

    let logical = unfold(text);
    let mut outcome = ParseOutcome::default();
    let mut draft: Option<EventDraft> = None;
    // Depth of nested non-event components (alarms etc.) whose properties
    // must not bleed into the enclosing event.
    let mut nested = 0usize;

    for line in &logical {
        let Some((name, params, value)) = split_property(line) else {
            continue;
        };
        let name_upper = name.to_ascii_uppercase();

        match name_upper.as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VEVENT") => {
                if draft.is_some() {
                    outcome
                        .issues
                        .push("record re-opened before close; open record discarded".to_string());
                }
                draft = Some(EventDraft::default());
                nested = 0;
            }
            "END" if value.eq_ignore_ascii_case("VEVENT") => {
                if let Some(finished) = draft.take() {
                    finish_record(finished, opts, &mut outcome);
                }
            }
            "BEGIN" if draft.is_some() => nested += 1,
            "END" if draft.is_some() => nested = nested.saturating_sub(1),
            _ => {
                if nested > 0 {
                    continue;
                }
                if let Some(open) = draft.as_mut() {
                    collect_property(open, &name_upper, params, value);
                }
            }
        }
    }

    if draft.is_some() {
        outcome.issues.push("unclosed record at end of input discarded".to_string());
    }

    Ok(outcome)
}

/// Join folded physical lines into logical lines. A leading space or tab
/// marks continuation; exactly that one indicator character is stripped and
/// the remainder concatenated with nothing inserted.
fn unfold(text: &str) -> Vec<String> {
    let mut logical: Vec<String> = Vec::new();
    for physical in text.split('\n') {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        if let Some(rest) = physical.strip_prefix(' ').or_else(|| physical.strip_prefix('\t')) {
            if let Some(last) = logical.last_mut() {
                last.push_str(rest);
            }
            // A continuation with nothing to continue is dropped.
        } else if !physical.is_empty() {
            logical.push(physical.to_string());
        }
    }
    logical
}

/// Split a logical line at the first unescaped colon into
/// (name, parameters, value). Parameters are the `;`-separated groups after
/// the property name. Lines without a colon carry no value and are ignored.
fn split_property(line: &str) -> Option<(&str, Vec<&str>, &str)> {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ':' if !escaped => {
                let (head, value) = (&line[..idx], &line[idx + 1..]);
                let mut parts = head.split(';');
                let name = parts.next().unwrap_or("");
                return Some((name, parts.collect(), value));
            }
            _ => escaped = false,
        }
    }
    None
}

/// Unescape `\n` `\,` `\;` `\\` (and the uppercase newline form) in a
/// property value.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                // Unknown escape: keep both characters.
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn collect_property(draft: &mut EventDraft, name: &str, _params: Vec<&str>, value: &str) {
    match name {
        "SUMMARY" => draft.summary = Some(unescape(value)),
        "DESCRIPTION" => draft.description = Some(unescape(value)),
        "LOCATION" => draft.location = Some(unescape(value)),
        "UID" => draft.uid = Some(value.trim().to_string()),
        // Date-only vs date-time is decided by the value's shape (and the
        // VALUE=DATE parameter produces exactly the 8-digit shape); a
        // trailing Z forces UTC. Both route through the shared dialect
        // table at finish time, so the raw string is kept here.
        "DTSTART" => draft.dtstart = Some(value.trim().to_string()),
        "DTEND" => draft.dtend = Some(value.trim().to_string()),
        _ if VERBATIM_PROPERTIES.contains(&name) => {
            let key = name.to_ascii_lowercase();
            // Repeated properties (several attendees) accumulate.
            if let Some((_, existing)) = draft.metadata.iter_mut().find(|(k, _)| k == &key) {
                existing.push(',');
                existing.push_str(value);
            } else {
                draft.metadata.push((key, value.to_string()));
            }
        }
        _ => {}
    }
}

/// Close out one record: missing summary or start skips it; a present but
/// unresolvable start drops it with a diagnostic.
fn finish_record(draft: EventDraft, opts: &ImportOptions, outcome: &mut ParseOutcome) {
    let (Some(summary), Some(dtstart)) = (draft.summary.as_ref(), draft.dtstart.as_ref()) else {
        outcome.records_skipped += 1;
        return;
    };

    let Some(start) = dates::resolve(dtstart, opts.date_order) else {
        outcome.issues.push(format!("unresolvable start '{}' in record", dtstart));
        return;
    };

    let event = match CanonicalEvent::new(&opts.user_id, summary, start, Source::Calendar) {
        Ok(event) => event,
        Err(constraint) => {
            outcome.issues.push(format!("record dropped: {}", constraint));
            return;
        }
    };
    let mut event = event.with_event_type("appointment");

    if let Some(desc) = &draft.description {
        event = event.with_description(desc);
    }
    if let Some(dtend) = &draft.dtend
        && let Some(end) = dates::resolve(dtend, opts.date_order)
    {
        event = event.with_end(end);
    }
    if let Some(uid) = draft.uid {
        event = event.with_source_id(uid);
    }
    if let Some(location) = draft.location
        && !location.trim().is_empty()
    {
        event = event.with_metadata("location", location.trim());
    }
    for (key, value) in draft.metadata {
        event = event.with_metadata(key, value);
    }

    outcome.events.push(event);
}
