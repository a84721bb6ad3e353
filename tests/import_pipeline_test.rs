//! End-to-end pipeline tests across mixed-format batches.
mod common;

use common::{calendar_text, csv_item, jpeg_with_capture_time, jpeg_with_lying_segment};
use lifeweave::error::{ErrorKind, FatalError};
use lifeweave::models::{ImportItem, ImportOptions, Layer, Source};
use lifeweave::pipeline::{import_batch, import_json, import_text};
use serde_json::json;

fn opts() -> ImportOptions {
    ImportOptions::default()
}

#[test]
fn test_mixed_batch_all_formats() {
    let items = vec![
        csv_item("events.csv", &[("Dinner with Sam", "2021-06-05", "birthday dinner")]),
        ImportItem::text(
            "calendar.ics",
            calendar_text(&[("Dentist", "20210607T090000Z")]),
        ),
        ImportItem::bytes("IMG_0042.jpg", jpeg_with_capture_time("2021:06:08 19:45:00")),
        ImportItem::json(
            "social.json",
            json!({"friends": [{"name": "Alex", "timestamp": 1622894400}]}),
        ),
        // Routinely present in vendor exports, never parsed.
        ImportItem::text("index.html", "<html></html>"),
        ImportItem::text("styles.css", "body {}"),
    ];

    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.stats.submitted, 6);
    assert_eq!(result.stats.processed, 4);
    assert_eq!(result.stats.skipped, 2);
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.events.len(), 4);

    let sources: Vec<Source> = result.events.iter().map(|e| e.source).collect();
    assert!(sources.contains(&Source::Csv));
    assert!(sources.contains(&Source::Calendar));
    assert!(sources.contains(&Source::Photo));
    assert!(sources.contains(&Source::Social));
}

#[test]
fn test_one_bad_item_in_hundred() {
    let mut items = Vec::new();
    for i in 0..100 {
        if i == 57 {
            items.push(ImportItem::text("item-57.csv", "Title,Date\n\"broken,2021-01-01\n"));
        } else {
            items.push(csv_item(
                &format!("item-{}.csv", i),
                &[(&format!("Event {}", i), "2021-06-05", "")],
            ));
        }
    }
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.stats.submitted, 100);
    assert_eq!(result.events.len(), 99);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].item, "item-57.csv");
    assert_eq!(result.errors[0].kind, ErrorKind::Format);
    assert!(result.errors[0].message.contains("unclosed quote"));
}

#[test]
fn test_fatal_buffer_lie_aborts_whole_batch() {
    let items = vec![
        csv_item("fine.csv", &[("Ok", "2021-06-05", "")]),
        ImportItem::bytes("corrupt.jpg", jpeg_with_lying_segment()),
    ];
    let err = import_batch(&items, &opts()).unwrap_err();
    assert!(matches!(err, FatalError::SegmentOverrun { .. }));
    assert!(err.to_string().contains("corrupt.jpg"));
}

#[test]
fn test_determinism_across_runs() {
    let items = vec![
        csv_item(
            "a.csv",
            &[("Flight to Lisbon", "2021-06-05", ""), ("Gym", "2021-06-06", "leg day")],
        ),
        ImportItem::text("cal.ics", calendar_text(&[("Standup", "20210607T091500Z")])),
        ImportItem::json(
            "takeout.json",
            json!({"locations": [
                {"timestampMs": "1622887200000", "latitudeE7": 488_584_000, "longitudeE7": 22_945_000}
            ]}),
        ),
    ];

    let first = import_batch(&items, &opts()).unwrap();
    let second = import_batch(&items, &opts()).unwrap();

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.errors, second.errors);
    // Everything except the per-run identifiers must match, including
    // order: the parallel merge preserves submission order.
    let fingerprint = |r: &lifeweave::models::ImportResult| {
        r.events
            .iter()
            .map(|e| (e.title.clone(), e.start, e.end, e.layer, e.source, e.source_id.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(fingerprint(&first), fingerprint(&second));
}

#[test]
fn test_photo_event_carries_capture_time() {
    let items =
        vec![ImportItem::bytes("IMG_0042.jpg", jpeg_with_capture_time("2021:06:08 19:45:00"))];
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.events.len(), 1);
    let ev = &result.events[0];
    assert_eq!(ev.layer, Layer::Media);
    assert_eq!(ev.start.to_rfc3339(), "2021-06-08T19:45:00+00:00");
    assert_eq!(ev.media, vec!["IMG_0042.jpg".to_string()]);
}

#[test]
fn test_jpeg_without_metadata_skips_quietly() {
    let items = vec![ImportItem::bytes("plain.jpg", vec![0xFF, 0xD8, 0xFF, 0xD9])];
    let result = import_batch(&items, &opts()).unwrap();
    assert!(result.events.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.stats.processed, 1);
}

#[test]
fn test_takeout_location_days_through_pipeline() {
    let result = import_json(
        "location-history.json",
        json!({"locations": [
            {"timestampMs": "1622887200000", "latitudeE7": 488_584_000, "longitudeE7": 22_945_000},
            {"timestampMs": "1622890800000", "latitudeE7": 488_600_000, "longitudeE7": 22_900_000}
        ]}),
        &opts(),
    )
    .unwrap();
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].layer, Layer::Travel);
    assert_eq!(result.stats.by_layer[&Layer::Travel], 1);
}

#[test]
fn test_import_text_with_hint_overrides_name() {
    let result = import_text(
        "data.txt",
        "Title,Date\nHidden CSV,2021-06-05\n",
        lifeweave::models::ItemHint::Csv,
        &opts(),
    )
    .unwrap();
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].title, "Hidden CSV");
}

#[test]
fn test_extra_keywords_flow_through_options() {
    let mut opts = opts();
    opts.extra_keywords.insert(Layer::Health, vec!["bouldering".to_string()]);
    let result = import_json(
        "notes.json",
        json!({"notes": [{"title": "Bouldering session",
                          "textContent": "new route",
                          "createdTimestampUsec": 1622894400000000i64}]}),
        &opts,
    )
    .unwrap();
    assert_eq!(result.events[0].layer, Layer::Health);
}

#[test]
fn test_calendar_folding_through_pipeline() {
    let text = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:Annual review mee\n ting with manager\nDTSTART:20210605T100000Z\nEND:VEVENT\nEND:VCALENDAR\n";
    let items = vec![ImportItem::text("work.ics", text)];
    let result = import_batch(&items, &opts()).unwrap();
    assert_eq!(result.events[0].title, "Annual review meeting with manager");
}

#[test]
fn test_user_id_stamped_on_every_event() {
    let custom = ImportOptions { user_id: "user-42".to_string(), ..opts() };
    let items = vec![
        csv_item("a.csv", &[("One", "2021-06-05", "")]),
        ImportItem::json(
            "social.json",
            json!({"friends": [{"name": "Sam", "timestamp": 1622894400}]}),
        ),
    ];
    let result = import_batch(&items, &custom).unwrap();
    assert!(result.events.iter().all(|e| e.user_id == "user-42"));
}
