//! Shared validation and sanitization primitives.
//!
//! Every parser and normalizer routes its range, size, and required-field
//! decisions through this module so the whole pipeline applies identical
//! ceilings and identical skip-vs-error rules. Nothing here clamps: an
//! out-of-range value is rejected, never adjusted.

use crate::error::ImportError;

/// Inclusive year window accepted anywhere a date is produced.
pub const YEAR_MIN: i32 = 1900;
pub const YEAR_MAX: i32 = 2100;

/// Character ceiling for event titles.
pub const MAX_TITLE_CHARS: usize = 200;
/// Character ceiling for event descriptions.
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
/// Default byte ceiling for a single import item: 10MB
pub const MAX_ITEM_BYTES: usize = 10 * 1024 * 1024;

/// Marker appended when free text is truncated at a ceiling.
const ELLIPSIS: char = '…';

pub fn year_in_range(year: i32) -> bool {
    (YEAR_MIN..=YEAR_MAX).contains(&year)
}

/// Gregorian leap-year rule (divisible by 4, except centuries unless
/// divisible by 400). Single implementation shared by every
/// date-producing component.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days in a month, honoring the leap rule. Returns 0 for an invalid month
/// so any day fails the bound check.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Calendar-consistent date check inside the global year window.
pub fn valid_date(year: i32, month: u32, day: u32) -> bool {
    year_in_range(year) && (1..=12).contains(&month) && day >= 1 && day <= days_in_month(year, month)
}

pub fn valid_time(hour: u32, minute: u32, second: u32) -> bool {
    hour <= 23 && minute <= 59 && second <= 59
}

/// GPS sanity: in-range coordinates that are not the (0, 0) null-island
/// sentinel many exporters write for "unknown".
pub fn valid_coords(lat: f64, lon: f64) -> bool {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return false;
    }
    !(lat == 0.0 && lon == 0.0)
}

/// Reject an item whose raw size exceeds the configured ceiling, before any
/// parsing happens. The error names the item and the limit.
pub fn check_size(len: usize, limit: usize, item: &str) -> Result<(), ImportError> {
    if len > limit {
        return Err(ImportError::size(
            item,
            format!("too large: {} bytes (limit {} bytes)", len, limit),
        ));
    }
    Ok(())
}

/// Strip control characters from free text, preserving newline and
/// carriage return so multi-line descriptions survive intact.
pub fn strip_control(text: &str) -> String {
    text.chars().filter(|c| !c.is_control() || *c == '\n' || *c == '\r').collect()
}

/// Truncate to at most `max` characters, marking the cut with an ellipsis.
/// Operates on chars, not bytes, so multi-byte text never splits mid-point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Sanitize a raw title: strip control characters, trim, truncate.
/// Returns None when nothing remains — a title is required, so callers
/// treat None as "skip this record".
pub fn clean_title(raw: &str) -> Option<String> {
    let stripped = strip_control(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, MAX_TITLE_CHARS))
}

/// Sanitize an optional description: strip control characters, trim,
/// truncate. None when empty — descriptions are optional.
pub fn clean_description(raw: &str) -> Option<String> {
    let stripped = strip_control(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_chars(trimmed, MAX_DESCRIPTION_CHARS))
}
