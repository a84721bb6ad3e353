//! The ordered dialect table.
//!
//! Each recognizer is a self-contained structural test plus extractor for
//! one date dialect. [`resolve`](crate::dates::resolve) walks the table and
//! takes the first success, so adding a dialect cannot change another's
//! behavior. Extractors hand their components to the shared calendar
//! validation; nothing here clamps or wraps.

use chrono::{DateTime, Utc};

use super::{DateOrder, datetime_from_parts};

pub(crate) struct Recognizer {
    pub name: &'static str,
    /// Cheap structural test: length, separators, digit grouping.
    pub matches: fn(&str) -> bool,
    /// Component extraction plus calendar validation.
    pub extract: fn(&str, DateOrder) -> Option<DateTime<Utc>>,
}

/// Dialects in resolution order. Unambiguous, fully specified shapes come
/// first; bare numerics come last.
pub(crate) const TABLE: &[Recognizer] = &[
    Recognizer { name: "iso-datetime", matches: is_iso_datetime, extract: extract_iso_datetime },
    Recognizer { name: "iso-date", matches: is_iso_date, extract: extract_iso_date },
    Recognizer { name: "colon-metadata", matches: is_colon_metadata, extract: extract_colon_metadata },
    Recognizer { name: "compact", matches: is_compact, extract: extract_compact },
    Recognizer { name: "slash", matches: is_slash, extract: extract_slash },
    Recognizer { name: "dash-dot", matches: is_dash_dot, extract: extract_dash_dot },
    Recognizer { name: "month-name", matches: is_month_name, extract: extract_month_name },
    Recognizer { name: "year-only", matches: is_year_only, extract: extract_year_only },
    Recognizer { name: "epoch", matches: is_epoch, extract: extract_epoch },
];

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn digits_at(s: &str, range: std::ops::Range<usize>) -> bool {
    s.get(range).is_some_and(all_digits)
}

// --- ISO-8601 date-time -------------------------------------------------

fn is_iso_datetime(s: &str) -> bool {
    s.len() >= 16
        && digits_at(s, 0..4)
        && s.as_bytes()[4] == b'-'
        && digits_at(s, 5..7)
        && s.as_bytes()[7] == b'-'
        && digits_at(s, 8..10)
        && matches!(s.as_bytes()[10], b'T' | b' ')
}

fn extract_iso_datetime(s: &str, _order: DateOrder) -> Option<DateTime<Utc>> {
    // Zone-carrying forms first (Z or numeric offset), then zoneless forms
    // interpreted as UTC.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return check_window(dt.with_timezone(&Utc));
    }
    const ZONELESS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in ZONELESS {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return check_window(naive.and_utc());
        }
    }
    None
}

fn check_window(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    use chrono::Datelike;
    crate::validate::year_in_range(dt.year()).then_some(dt)
}

// --- ISO-8601 date ------------------------------------------------------

fn is_iso_date(s: &str) -> bool {
    s.len() == 10
        && digits_at(s, 0..4)
        && s.as_bytes()[4] == b'-'
        && digits_at(s, 5..7)
        && s.as_bytes()[7] == b'-'
        && digits_at(s, 8..10)
}

fn extract_iso_date(s: &str, _order: DateOrder) -> Option<DateTime<Utc>> {
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[5..7].parse().ok()?;
    let day: u32 = s[8..10].parse().ok()?;
    datetime_from_parts(year, month, day, 0, 0, 0)
}

// --- Colon-delimited embedded-metadata form -----------------------------
// "2021:06:05 14:30:00" or date-only "2021:06:05".

fn is_colon_metadata(s: &str) -> bool {
    s.len() >= 10
        && digits_at(s, 0..4)
        && s.as_bytes()[4] == b':'
        && digits_at(s, 5..7)
        && s.as_bytes()[7] == b':'
        && digits_at(s, 8..10)
}

fn extract_colon_metadata(s: &str, _order: DateOrder) -> Option<DateTime<Utc>> {
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[5..7].parse().ok()?;
    let day: u32 = s[8..10].parse().ok()?;
    let rest = s[10..].trim();
    if rest.is_empty() {
        return datetime_from_parts(year, month, day, 0, 0, 0);
    }
    let mut time = rest.split(':');
    let hour: u32 = time.next()?.parse().ok()?;
    let minute: u32 = time.next()?.parse().ok()?;
    let second: u32 = time.next().unwrap_or("0").parse().ok()?;
    if time.next().is_some() {
        return None;
    }
    datetime_from_parts(year, month, day, hour, minute, second)
}

// --- Compact calendar-text forms ----------------------------------------
// "20210605", "20210605T143000", optional trailing Z.

fn is_compact(s: &str) -> bool {
    let body = s.strip_suffix('Z').unwrap_or(s);
    match body.len() {
        8 => all_digits(body),
        15 => digits_at(body, 0..8) && body.as_bytes()[8] == b'T' && digits_at(body, 9..15),
        _ => false,
    }
}

fn extract_compact(s: &str, _order: DateOrder) -> Option<DateTime<Utc>> {
    let body = s.strip_suffix('Z').unwrap_or(s);
    let year: i32 = body[0..4].parse().ok()?;
    let month: u32 = body[4..6].parse().ok()?;
    let day: u32 = body[6..8].parse().ok()?;
    if body.len() == 8 {
        return datetime_from_parts(year, month, day, 0, 0, 0);
    }
    let hour: u32 = body[9..11].parse().ok()?;
    let minute: u32 = body[11..13].parse().ok()?;
    let second: u32 = body[13..15].parse().ok()?;
    datetime_from_parts(year, month, day, hour, minute, second)
}

// --- Slash-separated ----------------------------------------------------
// "06/05/2021" is ambiguous between month-first and day-first; the caller's
// DateOrder decides, never a guess. "2021/06/05" is unambiguous year-first.

fn is_slash(s: &str) -> bool {
    let parts: Vec<&str> = s.split('/').collect();
    parts.len() == 3 && parts.iter().all(|p| all_digits(p))
}

fn extract_slash(s: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = s.split('/').collect();
    ordered_parts(&parts, order)
}

// --- Dash/dot-separated with trailing (or leading) 4-digit year ---------
// "05-06-2021", "05.06.2021", "2021.06.05". The plain ISO dash form is
// handled earlier; this recognizer covers day/month-first dashes and dots.

fn is_dash_dot(s: &str) -> bool {
    for sep in ['-', '.'] {
        let parts: Vec<&str> = s.split(sep).collect();
        if parts.len() == 3 && parts.iter().all(|p| all_digits(p)) {
            return true;
        }
    }
    false
}

fn extract_dash_dot(s: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    for sep in ['-', '.'] {
        let parts: Vec<&str> = s.split(sep).collect();
        if parts.len() == 3 && parts.iter().all(|p| all_digits(p)) {
            return ordered_parts(&parts, order);
        }
    }
    None
}

/// Shared day/month/year arrangement for separator dialects. A leading
/// 4-digit group is year-first; a trailing 4-digit group is ordered by the
/// caller's preference; anything else (2-digit years included) is rejected.
fn ordered_parts(parts: &[&str], order: DateOrder) -> Option<DateTime<Utc>> {
    let (year, a, b) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else if parts[2].len() == 4 {
        (parts[2], parts[0], parts[1])
    } else {
        return None;
    };
    let year: i32 = year.parse().ok()?;
    let a: u32 = a.parse().ok()?;
    let b: u32 = b.parse().ok()?;
    let (month, day) = if parts[0].len() == 4 {
        (a, b)
    } else {
        match order {
            DateOrder::MonthFirst => (a, b),
            DateOrder::DayFirst => (b, a),
        }
    };
    datetime_from_parts(year, month, day, 0, 0, 0)
}

// --- Month-name text ----------------------------------------------------
// "June 2021", "Jun 2021", "June 5, 2021", "5 June 2021".

fn month_from_name(token: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let token = token.trim_end_matches('.').to_lowercase();
    if token.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| *m == token || (token.len() >= 3 && m.starts_with(&token)))
        .map(|i| i as u32 + 1)
}

fn is_month_name(s: &str) -> bool {
    s.split_whitespace().any(|tok| month_from_name(tok).is_some())
}

fn extract_month_name(s: &str, _order: DateOrder) -> Option<DateTime<Utc>> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let month_pos = tokens.iter().position(|t| month_from_name(t).is_some())?;
    let month = month_from_name(tokens[month_pos])?;

    let numeric = |t: &str| -> Option<u32> { t.trim_end_matches(',').parse().ok() };

    match tokens.len() {
        // "June 2021"
        2 if month_pos == 0 => {
            let year: i32 = tokens[1].parse().ok()?;
            datetime_from_parts(year, month, 1, 0, 0, 0)
        }
        // "June 5, 2021" or "5 June 2021"
        3 => {
            let (day_tok, year_tok) = if month_pos == 0 {
                (tokens[1], tokens[2])
            } else if month_pos == 1 {
                (tokens[0], tokens[2])
            } else {
                return None;
            };
            let day = numeric(day_tok)?;
            let year: i32 = year_tok.parse().ok()?;
            datetime_from_parts(year, month, day, 0, 0, 0)
        }
        _ => None,
    }
}

// --- Year only ----------------------------------------------------------

fn is_year_only(s: &str) -> bool {
    s.len() == 4 && all_digits(s)
}

fn extract_year_only(s: &str, _order: DateOrder) -> Option<DateTime<Utc>> {
    let year: i32 = s.parse().ok()?;
    datetime_from_parts(year, 1, 1, 0, 0, 0)
}

// --- Unix epoch numeric -------------------------------------------------
// Seconds vs milliseconds auto-distinguished by magnitude; either way the
// result must land inside the year window.

const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

fn is_epoch(s: &str) -> bool {
    (5..=13).contains(&s.len()) && all_digits(s)
}

fn extract_epoch(s: &str, _order: DateOrder) -> Option<DateTime<Utc>> {
    let n: i64 = s.parse().ok()?;
    let dt = if n >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(n)?
    } else {
        DateTime::from_timestamp(n, 0)?
    };
    check_window(dt)
}
