//! Pipeline orchestrator.
//!
//! Fans a batch of input items out to the right parser or normalizer by
//! declared hint or name, and merges per-item outcomes into one
//! [`ImportResult`]. Items share no mutable state and each parse is a
//! pure, synchronous, bounded computation, so the batch runs across worker
//! threads; the parallel collect preserves submission order, which makes
//! the merged output reproducible run to run.
//!
//! Partial-failure policy: one malformed item contributes one error and
//! its siblings continue. Only a [`FatalError`] (a buffer lying about its
//! own structure) aborts the batch, propagated to the caller.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FatalError, ImportError};
use crate::models::{ImportItem, ImportOptions, ImportResult, ImportStats, ItemHint, Payload};
use crate::normalize::{social, takeout};
use crate::parsers::{ParseOutcome, calendar, photo, tabular};
use crate::validate;

/// Name suffixes routed to each parser when no hint is given.
const TABULAR_EXTENSIONS: &[&str] = &["csv", "tsv"];
const CALENDAR_EXTENSIONS: &[&str] = &["ics", "ical"];
const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff"];
const VENDOR_EXTENSIONS: &[&str] = &["json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Tabular,
    Calendar,
    Photo,
    Vendor,
    /// Categories the pipeline never attempts (markup, stylesheets,
    /// scripts, non-metadata binaries). They routinely co-occur with a
    /// vendor export, so they count as skipped, not as errors.
    Skip,
}

fn route(item: &ImportItem) -> Route {
    if let Some(hint) = item.hint {
        return match hint {
            ItemHint::Csv => Route::Tabular,
            ItemHint::Calendar => Route::Calendar,
            ItemHint::Photo => Route::Photo,
            ItemHint::VendorJson => Route::Vendor,
        };
    }
    let extension = item.name.rsplit('.').next().unwrap_or("").to_lowercase();
    if TABULAR_EXTENSIONS.contains(&extension.as_str()) {
        Route::Tabular
    } else if CALENDAR_EXTENSIONS.contains(&extension.as_str()) {
        Route::Calendar
    } else if PHOTO_EXTENSIONS.contains(&extension.as_str()) {
        Route::Photo
    } else if VENDOR_EXTENSIONS.contains(&extension.as_str()) {
        Route::Vendor
    } else {
        Route::Skip
    }
}

/// Per-item result before merging.
struct ItemOutcome {
    events: Vec<crate::models::CanonicalEvent>,
    errors: Vec<ImportError>,
    processed: bool,
    skipped: bool,
}

impl ItemOutcome {
    fn skipped() -> Self {
        Self { events: Vec::new(), errors: Vec::new(), processed: false, skipped: true }
    }

    fn failed(error: ImportError) -> Self {
        Self { events: Vec::new(), errors: vec![error], processed: false, skipped: false }
    }

    fn parsed(name: &str, outcome: ParseOutcome) -> Self {
        let errors =
            outcome.issues.into_iter().map(|issue| ImportError::field(name, issue)).collect();
        if outcome.records_skipped > 0 {
            debug!(item = name, skipped = outcome.records_skipped, "records skipped");
        }
        Self { events: outcome.events, errors, processed: true, skipped: false }
    }
}

/// Import a batch of items with the default (never-cancelled) behavior.
pub fn import_batch(
    items: &[ImportItem],
    opts: &ImportOptions,
) -> Result<ImportResult, FatalError> {
    run_batch(items, opts, None)
}

/// Import a batch with cooperative cancellation. The flag is checked only
/// between items: an in-flight parse always runs to completion, and events
/// from items finished before cancellation are retained in the result.
pub fn import_batch_cancellable(
    items: &[ImportItem],
    opts: &ImportOptions,
    cancel: &AtomicBool,
) -> Result<ImportResult, FatalError> {
    run_batch(items, opts, Some(cancel))
}

/// Import one already-decoded text item.
pub fn import_text(
    name: &str,
    text: &str,
    hint: ItemHint,
    opts: &ImportOptions,
) -> Result<ImportResult, FatalError> {
    let item = ImportItem::text(name, text).with_hint(hint);
    import_batch(std::slice::from_ref(&item), opts)
}

/// Import one already-parsed vendor JSON structure.
pub fn import_json(
    name: &str,
    value: Value,
    opts: &ImportOptions,
) -> Result<ImportResult, FatalError> {
    let item = ImportItem::json(name, value).with_hint(ItemHint::VendorJson);
    import_batch(std::slice::from_ref(&item), opts)
}

fn run_batch(
    items: &[ImportItem],
    opts: &ImportOptions,
    cancel: Option<&AtomicBool>,
) -> Result<ImportResult, FatalError> {
    let per_item: Result<Vec<ItemOutcome>, FatalError> = items
        .par_iter()
        .map(|item| {
            if let Some(flag) = cancel
                && flag.load(Ordering::Relaxed)
            {
                debug!(item = %item.name, "cancelled before start");
                return Ok(ItemOutcome::skipped());
            }
            process_item(item, opts)
        })
        .collect();
    let per_item = per_item?;

    // Order-independent aggregate merge; the list concatenation follows
    // submission order because the parallel collect preserves it.
    let mut result = ImportResult::default();
    result.stats.submitted = items.len();
    for outcome in per_item {
        merge_outcome(&mut result, outcome);
    }

    debug!(
        submitted = result.stats.submitted,
        processed = result.stats.processed,
        skipped = result.stats.skipped,
        events = result.stats.events,
        errors = result.errors.len(),
        "batch merged"
    );
    Ok(result)
}

fn merge_outcome(result: &mut ImportResult, outcome: ItemOutcome) {
    let mut stats = ImportStats::default();
    if outcome.processed {
        stats.processed = 1;
    }
    if outcome.skipped {
        stats.skipped = 1;
    }
    for event in &outcome.events {
        stats.record_event(event.layer);
    }
    result.stats.merge(stats);
    result.events.extend(outcome.events);
    result.errors.extend(outcome.errors);
}

fn process_item(item: &ImportItem, opts: &ImportOptions) -> Result<ItemOutcome, FatalError> {
    let routed = route(item);
    if routed == Route::Skip {
        debug!(item = %item.name, "skipped by content-type gating");
        return Ok(ItemOutcome::skipped());
    }

    // The ceiling applies before any parsing, whatever the format.
    if let Err(error) = validate::check_size(item.payload.size(), opts.max_item_bytes, &item.name)
    {
        warn!(item = %item.name, "item over size ceiling");
        return Ok(ItemOutcome::failed(error));
    }

    match routed {
        Route::Tabular => {
            let Some(text) = payload_text(&item.payload) else {
                return Ok(text_expected(&item.name));
            };
            match tabular::parse_auto(&text, opts) {
                Ok(outcome) => Ok(ItemOutcome::parsed(&item.name, outcome)),
                Err(error) => Ok(ItemOutcome::failed(ImportError::format(
                    &item.name,
                    error.to_string(),
                ))),
            }
        }
        Route::Calendar => {
            let Some(text) = payload_text(&item.payload) else {
                return Ok(text_expected(&item.name));
            };
            match calendar::parse(&text, opts) {
                Ok(outcome) => Ok(ItemOutcome::parsed(&item.name, outcome)),
                Err(error @ calendar::CalendarError::TooLarge { .. }) => {
                    Ok(ItemOutcome::failed(ImportError::size(&item.name, error.to_string())))
                }
            }
        }
        Route::Photo => {
            let Payload::Bytes(bytes) = &item.payload else {
                return Ok(ItemOutcome::failed(ImportError::format(
                    &item.name,
                    "photo items require raw bytes",
                )));
            };
            let outcome = photo::parse(bytes, &item.name, opts)?;
            Ok(ItemOutcome::parsed(&item.name, outcome))
        }
        Route::Vendor => {
            let value = match &item.payload {
                Payload::Json(value) => value.clone(),
                Payload::Text(text) => match serde_json::from_str::<Value>(text) {
                    Ok(value) => value,
                    Err(error) => {
                        return Ok(ItemOutcome::failed(ImportError::format(
                            &item.name,
                            format!("not valid JSON: {}", error),
                        )));
                    }
                },
                Payload::Bytes(bytes) => match serde_json::from_slice::<Value>(bytes) {
                    Ok(value) => value,
                    Err(error) => {
                        return Ok(ItemOutcome::failed(ImportError::format(
                            &item.name,
                            format!("not valid JSON: {}", error),
                        )));
                    }
                },
            };
            // Shapes are probed in a fixed order; the first normalizer
            // that recognizes the structure owns it.
            let normalized =
                takeout::normalize(&value, opts).or_else(|| social::normalize(&value, opts));
            match normalized {
                Some(outcome) => Ok(ItemOutcome::parsed(&item.name, outcome)),
                None => Ok(ItemOutcome::failed(ImportError::format(
                    &item.name,
                    "JSON matches no known export shape",
                ))),
            }
        }
        Route::Skip => unreachable!("skip handled above"),
    }
}

fn payload_text(payload: &Payload) -> Option<String> {
    match payload {
        Payload::Text(text) => Some(text.clone()),
        Payload::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Payload::Json(_) => None,
    }
}

fn text_expected(name: &str) -> ItemOutcome {
    ItemOutcome::failed(ImportError::format(name, "expected text content for this format"))
}
