//! Delimited-text (tabular) parser.
//!
//! A character-level state machine tokenizes rows: fields are unquoted or
//! quoted, a doubled quote inside a quoted field is a literal quote, and an
//! unterminated quoted field is a hard "unclosed quote" failure rather than
//! silent truncation. The first row names the fields; short data rows are
//! backfilled with empty trailing fields.
//!
//! Two entry points: [`parse_with_mapping`] takes an explicit header-name
//! mapping, [`parse_auto`] matches headers against an ordered synonym table
//! per canonical field and fails descriptively when no title-like or
//! date-like column exists.

use thiserror::Error;

use crate::dates;
use crate::models::{CanonicalEvent, ImportOptions, Layer, Source};
use crate::parsers::ParseOutcome;

/// Ordered synonym tables for header auto-detection. Earlier entries win.
const TITLE_SYNONYMS: &[&str] = &["title", "name", "summary", "subject", "event", "activity"];
const DATE_SYNONYMS: &[&str] =
    &["date", "start", "start date", "start_date", "when", "timestamp", "datetime", "day"];
const DESCRIPTION_SYNONYMS: &[&str] =
    &["description", "notes", "details", "memo", "body", "comment"];
const END_SYNONYMS: &[&str] = &["end", "end date", "end_date", "until", "finish"];
const LAYER_SYNONYMS: &[&str] = &["layer", "category", "type", "tag"];
const LOCATION_SYNONYMS: &[&str] = &["location", "place", "where", "venue"];

/// Item-level tabular failures (format kind).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TabularError {
    #[error("unclosed quote in field starting on line {line}")]
    UnclosedQuote { line: usize },
    #[error("input has no rows")]
    Empty,
    #[error("no title-like column found (looked for: {})", TITLE_SYNONYMS.join(", "))]
    NoTitleColumn,
    #[error("no date-like column found (looked for: {})", DATE_SYNONYMS.join(", "))]
    NoDateColumn,
    #[error("mapped column not present in header: {0}")]
    MissingColumn(String),
}

/// Explicit header-name mapping for [`parse_with_mapping`]. Header lookup
/// is case-insensitive.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub title: String,
    pub date: String,
    pub description: Option<String>,
    pub end: Option<String>,
    pub layer: Option<String>,
    pub location: Option<String>,
}

/// Resolved column indexes after header matching.
#[derive(Debug, Default)]
struct ColumnMap {
    title: usize,
    date: usize,
    description: Option<usize>,
    end: Option<usize>,
    layer: Option<usize>,
    location: Option<usize>,
}

/// Tokenizer states. `QuotePending` means a quote was seen inside a quoted
/// field: the next character decides between an escaped literal quote and
/// the end of the quoted section.
enum State {
    Unquoted,
    Quoted,
    QuotePending,
}

/// Split raw text into trimmed rows of fields.
///
/// Quoted fields may contain the delimiter and line breaks. EOF inside a
/// quoted field is the unclosed-quote error, carrying the line the field
/// started on.
pub fn parse_rows(text: &str) -> Result<Vec<Vec<String>>, TabularError> {
    let delimiter = detect_delimiter(text);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut state = State::Unquoted;
    let mut line = 1usize;
    let mut quote_open_line = 1usize;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        match state {
            State::Unquoted => {
                if c == '"' && field.trim().is_empty() {
                    // Quote at field start opens a quoted section.
                    field.clear();
                    quote_open_line = line;
                    state = State::Quoted;
                } else if c == delimiter {
                    push_field(&mut row, &mut field);
                } else if c == '\n' {
                    end_row(&mut rows, &mut row, &mut field);
                } else if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                    line += 1;
                    end_row(&mut rows, &mut row, &mut field);
                } else {
                    field.push(c);
                }
            }
            State::Quoted => {
                if c == '"' {
                    state = State::QuotePending;
                } else {
                    field.push(c);
                }
            }
            State::QuotePending => {
                if c == '"' {
                    // Doubled quote: escaped literal.
                    field.push('"');
                    state = State::Quoted;
                } else if c == delimiter {
                    push_field(&mut row, &mut field);
                    state = State::Unquoted;
                } else if c == '\n' {
                    end_row(&mut rows, &mut row, &mut field);
                    state = State::Unquoted;
                } else if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                    line += 1;
                    end_row(&mut rows, &mut row, &mut field);
                    state = State::Unquoted;
                } else {
                    // Stray text after the closing quote: keep it, the
                    // quoted section is over.
                    field.push(c);
                    state = State::Unquoted;
                }
            }
        }
    }

    if matches!(state, State::Quoted) {
        return Err(TabularError::UnclosedQuote { line: quote_open_line });
    }

    // Flush the final row when the input has no trailing newline.
    if !field.is_empty() || !row.is_empty() {
        end_row(&mut rows, &mut row, &mut field);
    }

    Ok(rows)
}

fn push_field(row: &mut Vec<String>, field: &mut String) {
    row.push(std::mem::take(field).trim().to_string());
}

fn end_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    // A bare newline after a complete row produces an empty row; drop it.
    if row.is_empty() && field.trim().is_empty() {
        field.clear();
        return;
    }
    push_field(row, field);
    rows.push(std::mem::take(row));
}

/// Pick the delimiter by frequency in the first line: comma, semicolon, or
/// tab, defaulting to comma.
fn detect_delimiter(text: &str) -> char {
    let first_line = text.lines().next().unwrap_or("");
    let counts =
        [',', ';', '\t'].map(|d| (d, first_line.chars().filter(|c| *c == d).count()));
    counts.into_iter().max_by_key(|(_, n)| *n).filter(|(_, n)| *n > 0).map(|(d, _)| d).unwrap_or(',')
}

/// Parse with headers auto-detected from the synonym tables.
pub fn parse_auto(text: &str, opts: &ImportOptions) -> Result<ParseOutcome, TabularError> {
    let rows = parse_rows(text)?;
    let (header, data) = rows.split_first().ok_or(TabularError::Empty)?;
    let lower: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

    let find = |synonyms: &[&str]| -> Option<usize> {
        synonyms.iter().find_map(|syn| lower.iter().position(|h| h == syn))
    };

    let columns = ColumnMap {
        title: find(TITLE_SYNONYMS).ok_or(TabularError::NoTitleColumn)?,
        date: find(DATE_SYNONYMS).ok_or(TabularError::NoDateColumn)?,
        description: find(DESCRIPTION_SYNONYMS),
        end: find(END_SYNONYMS),
        layer: find(LAYER_SYNONYMS),
        location: find(LOCATION_SYNONYMS),
    };

    Ok(rows_to_events(data, &columns, opts))
}

/// Parse with an explicit header-name mapping.
pub fn parse_with_mapping(
    text: &str,
    mapping: &FieldMapping,
    opts: &ImportOptions,
) -> Result<ParseOutcome, TabularError> {
    let rows = parse_rows(text)?;
    let (header, data) = rows.split_first().ok_or(TabularError::Empty)?;
    let lower: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

    let require = |name: &str| -> Result<usize, TabularError> {
        lower
            .iter()
            .position(|h| h == &name.trim().to_lowercase())
            .ok_or_else(|| TabularError::MissingColumn(name.to_string()))
    };
    let optional = |name: &Option<String>| -> Result<Option<usize>, TabularError> {
        name.as_deref().map(require).transpose()
    };

    let columns = ColumnMap {
        title: require(&mapping.title)?,
        date: require(&mapping.date)?,
        description: optional(&mapping.description)?,
        end: optional(&mapping.end)?,
        layer: optional(&mapping.layer)?,
        location: optional(&mapping.location)?,
    };

    Ok(rows_to_events(data, &columns, opts))
}

/// Convert data rows to events under the shared row policy: rows missing a
/// title or date are skipped; rows whose date is present but unresolvable
/// are dropped with a per-row diagnostic; everything else continues.
fn rows_to_events(data: &[Vec<String>], columns: &ColumnMap, opts: &ImportOptions) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (i, row) in data.iter().enumerate() {
        // Header row is row 0 for the reader; data rows report 1-based
        // positions counted after it.
        let row_num = i + 2;
        let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

        let title = cell(columns.title);
        let date_raw = cell(columns.date);
        if title.is_empty() || date_raw.is_empty() {
            outcome.records_skipped += 1;
            continue;
        }

        let Some(start) = dates::resolve(date_raw, opts.date_order) else {
            outcome.issues.push(format!("row {}: unresolvable date '{}'", row_num, date_raw));
            continue;
        };

        let event = match CanonicalEvent::new(&opts.user_id, title, start, Source::Csv) {
            Ok(event) => event,
            Err(constraint) => {
                outcome.issues.push(format!("row {}: {}", row_num, constraint));
                continue;
            }
        };

        let mut event = event.with_event_type("imported");
        if let Some(idx) = columns.description
            && !cell(idx).is_empty()
        {
            event = event.with_description(cell(idx));
        }
        if let Some(idx) = columns.end
            && let Some(end) = dates::resolve(cell(idx), opts.date_order)
        {
            event = event.with_end(end);
        }
        if let Some(idx) = columns.layer
            && let Ok(layer) = cell(idx).parse::<Layer>()
        {
            event = event.with_layer(layer);
        }
        if let Some(idx) = columns.location
            && !cell(idx).is_empty()
        {
            // Name-only location: no coordinates to validate, keep it as
            // metadata rather than a half-populated GeoLocation.
            event = event.with_metadata("location", cell(idx));
        }

        outcome.events.push(event);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    fn opts() -> ImportOptions {
        ImportOptions::default()
    }

    #[test]
    fn test_parse_rows_escaped_quote() {
        let rows = parse_rows("Title,Date\n\"John \"\"Junior\"\"\",2021-01-01").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "John \"Junior\"");
        assert_eq!(rows[1][1], "2021-01-01");
    }

    #[test]
    fn test_parse_rows_unclosed_quote() {
        let err = parse_rows("Name,Value\n\"John,30").unwrap_err();
        assert_eq!(err, TabularError::UnclosedQuote { line: 2 });
    }

    #[test]
    fn test_parse_rows_quoted_delimiter_and_newline() {
        let rows = parse_rows("a,b\n\"x, y\",\"line1\nline2\"").unwrap();
        assert_eq!(rows[1][0], "x, y");
        assert_eq!(rows[1][1], "line1\nline2");
    }

    #[test]
    fn test_parse_rows_trims_values() {
        let rows = parse_rows("a, b \n 1 ,2").unwrap();
        assert_eq!(rows[0], vec!["a", "b"]);
        assert_eq!(rows[1], vec!["1", "2"]);
    }

    #[test]
    fn test_parse_rows_crlf() {
        let rows = parse_rows("a,b\r\n1,2\r\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["1", "2"]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("plain"), ',');
    }

    #[test]
    fn test_parse_auto_basic() {
        let text = "Title,Date,Notes\nDinner,2021-06-05,with Sam\n";
        let outcome = parse_auto(text, &opts()).unwrap();
        assert_eq!(outcome.events.len(), 1);
        let ev = &outcome.events[0];
        assert_eq!(ev.title, "Dinner");
        assert_eq!(ev.description.as_deref(), Some("with Sam"));
        assert_eq!((ev.start.year(), ev.start.month(), ev.start.day()), (2021, 6, 5));
        assert_eq!(ev.source, Source::Csv);
    }

    #[test]
    fn test_parse_auto_synonym_order() {
        // Both "name" and "title" present: "title" is the earlier synonym.
        let text = "Name,Title,Date\nwrong,right,2021-06-05\n";
        let outcome = parse_auto(text, &opts()).unwrap();
        assert_eq!(outcome.events[0].title, "right");
    }

    #[test]
    fn test_parse_auto_no_title_column() {
        let err = parse_auto("Foo,Date\nx,2021-01-01\n", &opts()).unwrap_err();
        assert_eq!(err, TabularError::NoTitleColumn);
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_parse_auto_no_date_column() {
        let err = parse_auto("Title,Foo\nx,y\n", &opts()).unwrap_err();
        assert_eq!(err, TabularError::NoDateColumn);
    }

    #[test]
    fn test_rows_missing_title_or_date_skipped_not_errored() {
        let text = "Title,Date\n,2021-01-01\nDinner,\nOk,2021-06-05\n";
        let outcome = parse_auto(text, &opts()).unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.records_skipped, 2);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_invalid_date_reported_row_dropped_batch_continues() {
        let text = "Title,Date\nBad,99/99/2021\nGood,2021-06-05\n";
        let outcome = parse_auto(text, &opts()).unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].title, "Good");
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].contains("99/99/2021"));
    }

    #[test]
    fn test_short_rows_backfilled() {
        let text = "Title,Date,Notes\nDinner,2021-06-05\n";
        let outcome = parse_auto(text, &opts()).unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert!(outcome.events[0].description.is_none());
    }

    #[test]
    fn test_layer_and_location_columns() {
        let text = "Title,Date,Category,Place\nCheckup,2021-06-05,health,Clinic\n";
        let outcome = parse_auto(text, &opts()).unwrap();
        let ev = &outcome.events[0];
        assert_eq!(ev.layer, Layer::Health);
        assert_eq!(ev.metadata.get("location").map(String::as_str), Some("Clinic"));
    }

    #[test]
    fn test_parse_with_mapping() {
        let text = "When It Happened,What\n2021-06-05,Dinner\n";
        let mapping = FieldMapping {
            title: "What".to_string(),
            date: "When It Happened".to_string(),
            description: None,
            end: None,
            layer: None,
            location: None,
        };
        let outcome = parse_with_mapping(text, &mapping, &opts()).unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].title, "Dinner");
    }

    #[test]
    fn test_parse_with_mapping_missing_column() {
        let mapping = FieldMapping {
            title: "Nope".to_string(),
            date: "Date".to_string(),
            description: None,
            end: None,
            layer: None,
            location: None,
        };
        let err = parse_with_mapping("Title,Date\nx,2021-01-01\n", &mapping, &opts()).unwrap_err();
        assert_eq!(err, TabularError::MissingColumn("Nope".to_string()));
    }

    #[test]
    fn test_slash_dates_respect_locale_option() {
        let text = "Title,Date\nX,06/05/2021\n";
        let mdy = parse_auto(text, &opts()).unwrap();
        assert_eq!((mdy.events[0].start.month(), mdy.events[0].start.day()), (6, 5));

        let dmy_opts =
            ImportOptions { date_order: crate::dates::DateOrder::DayFirst, ..opts() };
        let dmy = parse_auto(text, &dmy_opts).unwrap();
        assert_eq!((dmy.events[0].start.month(), dmy.events[0].start.day()), (5, 6));
    }
}
