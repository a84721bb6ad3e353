//! Date-dialect resolution.
//!
//! Personal-history exports write dates in nine-plus dialects: ISO-8601
//! with and without time or zone, ambiguous slash forms, dotted European
//! forms, month-name text, bare years, epoch numerics in seconds or
//! milliseconds, the colon-delimited embedded-metadata form, and compact
//! calendar-text forms. [`resolve`] tries an ordered table of independent
//! recognizers and returns the first valid timestamp, or None as a
//! definitive failure. Ambiguity (06/05/2021) is settled by the caller's
//! explicit [`DateOrder`], never guessed.
//!
//! Every extracted component passes the shared calendar validation in
//! [`crate::validate`] (leap rule included) and the global year window;
//! invalid results are rejected, never clamped.

mod recognizers;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::validate;

/// How to read the first two components of an ambiguous slash/dash/dot
/// date. Supplied explicitly by the caller (a locale preference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    /// 06/05/2021 is June 5th.
    MonthFirst,
    /// 06/05/2021 is May 6th.
    DayFirst,
}

/// Resolve one date string against the dialect table.
///
/// Recognizers are tried in table order; a recognizer whose structural test
/// matches but whose extraction fails does not stop the chain, so a string
/// like `2021-13-40` falls all the way through to a definitive None.
pub fn resolve(text: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for recognizer in recognizers::TABLE {
        if (recognizer.matches)(text)
            && let Some(dt) = (recognizer.extract)(text, order)
        {
            tracing::trace!(dialect = recognizer.name, input = text, "date dialect resolved");
            return Some(dt);
        }
    }
    None
}

/// First-success-wins combinator over candidate strings, supporting
/// priority chains such as original-capture over file-modified timestamps.
/// Absent candidates are passed over silently.
pub fn best_of<'a, I>(candidates: I, order: DateOrder) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates.into_iter().flatten().find_map(|c| resolve(c, order))
}

/// Scan arbitrary text (a file path or name) for an embedded date
/// fragment: `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY_MM_DD`, or `YYYYMMDD`.
///
/// This is a lower-confidence fallback used only when no authoritative
/// field resolved; it is deliberately not part of the [`resolve`] table.
pub fn from_path(text: &str) -> Option<DateTime<Utc>> {
    let bytes = text.as_bytes();
    let digit = |i: usize| bytes.get(i).copied().filter(u8::is_ascii_digit).map(|b| (b - b'0') as u32);

    for start in 0..bytes.len() {
        // Candidate must open with a plausible 4-digit year.
        let (Some(y1), Some(y2), Some(y3), Some(y4)) =
            (digit(start), digit(start + 1), digit(start + 2), digit(start + 3))
        else {
            continue;
        };
        let year = (y1 * 1000 + y2 * 100 + y3 * 10 + y4) as i32;
        if !validate::year_in_range(year) {
            continue;
        }

        // Separated form: YYYY<sep>MM<sep>DD with matching separators.
        if let Some(&sep) = bytes.get(start + 4)
            && matches!(sep, b'-' | b'/' | b'_')
            && bytes.get(start + 7) == Some(&sep)
            && let (Some(m1), Some(m2), Some(d1), Some(d2)) =
                (digit(start + 5), digit(start + 6), digit(start + 8), digit(start + 9))
        {
            let month = m1 * 10 + m2;
            let day = d1 * 10 + d2;
            // A following digit would make the day part of a longer number.
            if digit(start + 10).is_none()
                && let Some(dt) = datetime_from_parts(year, month, day, 0, 0, 0)
            {
                return Some(dt);
            }
        }

        // Contiguous form: YYYYMMDD bounded by non-digits.
        if let (Some(m1), Some(m2), Some(d1), Some(d2)) =
            (digit(start + 4), digit(start + 5), digit(start + 6), digit(start + 7))
        {
            let month = m1 * 10 + m2;
            let day = d1 * 10 + d2;
            let bounded = (start == 0 || !bytes[start - 1].is_ascii_digit())
                && digit(start + 8).is_none();
            if bounded && let Some(dt) = datetime_from_parts(year, month, day, 0, 0, 0) {
                return Some(dt);
            }
        }
    }
    None
}

/// Assemble a UTC timestamp from validated components. The single gate all
/// recognizers pass through: shared calendar rules, shared year window.
pub(crate) fn datetime_from_parts(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Utc>> {
    if !validate::valid_date(year, month, day) || !validate::valid_time(hour, minute, second) {
        return None;
    }
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second).single()
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    #[test]
    fn test_resolve_every_dialect_preserves_components() {
        let cases = [
            ("2021-06-05", DateOrder::MonthFirst),
            ("2021-06-05T14:30:00Z", DateOrder::MonthFirst),
            ("2021:06:05 14:30:00", DateOrder::MonthFirst),
            ("20210605", DateOrder::MonthFirst),
            ("06/05/2021", DateOrder::MonthFirst),
            ("05/06/2021", DateOrder::DayFirst),
            ("05.06.2021", DateOrder::DayFirst),
            ("June 5, 2021", DateOrder::MonthFirst),
        ];
        for (input, order) in cases {
            let dt = resolve(input, order).unwrap_or_else(|| panic!("failed: {}", input));
            assert_eq!((dt.year(), dt.month(), dt.day()), (2021, 6, 5), "{}", input);
        }
    }

    #[test]
    fn test_resolve_leap_day() {
        assert!(resolve("2024-02-29", DateOrder::MonthFirst).is_some());
        assert!(resolve("2023-02-29", DateOrder::MonthFirst).is_none());
    }

    #[test]
    fn test_resolve_rejects_out_of_window() {
        assert!(resolve("1899-12-31", DateOrder::MonthFirst).is_none());
        assert!(resolve("2101-01-01", DateOrder::MonthFirst).is_none());
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        assert!(resolve("", DateOrder::MonthFirst).is_none());
        assert!(resolve("not a date", DateOrder::MonthFirst).is_none());
        assert!(resolve("2021-13-40", DateOrder::MonthFirst).is_none());
        assert!(resolve("99/99/2021", DateOrder::MonthFirst).is_none());
    }

    #[test]
    fn test_resolve_year_only_beats_epoch() {
        let dt = resolve("2021", DateOrder::MonthFirst).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2021, 1, 1));
    }

    #[test]
    fn test_best_of_priority_chain() {
        let capture = Some("2021:06:05 14:30:00");
        let modified = Some("2022-01-01");
        let dt = best_of([None, capture, modified], DateOrder::MonthFirst).unwrap();
        assert_eq!(dt.year(), 2021);

        // First candidate invalid: falls through to the next valid one.
        let dt = best_of([Some("garbage"), modified], DateOrder::MonthFirst).unwrap();
        assert_eq!(dt.year(), 2022);

        assert!(best_of::<[Option<&str>; 2]>([None, None], DateOrder::MonthFirst).is_none());
    }

    #[test]
    fn test_from_path_fragments() {
        let cases = [
            "photos/2021/2021-06-05/IMG_0001.jpg",
            "backup/2021_06_05.tar",
            "IMG_20210605_143000.jpg",
            "2021/06/05/note.txt",
        ];
        for case in cases {
            let dt = from_path(case).unwrap_or_else(|| panic!("failed: {}", case));
            assert_eq!((dt.year(), dt.month(), dt.day()), (2021, 6, 5), "{}", case);
        }
    }

    #[test]
    fn test_from_path_rejects_invalid_fragments() {
        assert!(from_path("IMG_99999999.jpg").is_none());
        assert!(from_path("report-2021-13-40.txt").is_none());
        assert!(from_path("no date here").is_none());
    }

    #[test]
    fn test_from_path_ignores_longer_numbers() {
        // 12-digit number: the window that looks like a date is part of a
        // longer digit run and must not be read as one.
        assert!(from_path("serial-202106051234-x").is_none());
    }
}
