/// Edge case integration tests
///
/// These tests cover unusual inputs: empty batches, empty files, unicode
/// content, and boundary dates.
mod common;

use common::csv_item;
use lifeweave::dates::{self, DateOrder};
use lifeweave::models::{ImportItem, ImportOptions};
use lifeweave::pipeline::import_batch;

fn opts() -> ImportOptions {
    ImportOptions::default()
}

#[test]
fn test_empty_batch() {
    let result = import_batch(&[], &opts()).unwrap();
    assert_eq!(result.stats.submitted, 0);
    assert!(result.events.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_empty_csv_file() {
    let items = vec![ImportItem::text("empty.csv", "")];
    let result = import_batch(&items, &opts()).unwrap();
    // No rows at all is an unrecognizable shape, not a crash.
    assert!(result.events.is_empty());
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn test_header_only_csv() {
    let items = vec![ImportItem::text("header.csv", "Title,Date\n")];
    let result = import_batch(&items, &opts()).unwrap();
    assert!(result.events.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.stats.processed, 1);
}

#[test]
fn test_unicode_titles_survive() {
    let items = vec![csv_item("u.csv", &[("Кофе с Аней ☕", "2021-06-05", "日本語メモ")])];
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.events[0].title, "Кофе с Аней ☕");
    assert_eq!(result.events[0].description.as_deref(), Some("日本語メモ"));
}

#[test]
fn test_year_window_boundaries() {
    assert!(dates::resolve("1900-01-01", DateOrder::MonthFirst).is_some());
    assert!(dates::resolve("2100-12-31", DateOrder::MonthFirst).is_some());
    assert!(dates::resolve("1899-12-31", DateOrder::MonthFirst).is_none());
    assert!(dates::resolve("2101-01-01", DateOrder::MonthFirst).is_none());

    let items = vec![csv_item(
        "bounds.csv",
        &[("Too old", "1899-12-31", ""), ("In range", "1900-01-01", "")],
    )];
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].title, "In range");
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn test_control_characters_stripped_from_titles() {
    let items = vec![ImportItem::text(
        "ctl.csv",
        "Title,Date\nBell\u{7}inside,2021-06-05\n",
    )];
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.events[0].title, "Bellinside");
}

#[test]
fn test_crlf_calendar_input() {
    let text = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:Windows export\r\nDTSTART:20210605T100000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let items = vec![ImportItem::text("win.ics", text)];
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].title, "Windows export");
}

#[test]
fn test_bytes_payload_decoded_as_text() {
    let items = vec![ImportItem::bytes(
        "raw.csv",
        b"Title,Date\nFrom bytes,2021-06-05\n".to_vec(),
    )];
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.events[0].title, "From bytes");
}
