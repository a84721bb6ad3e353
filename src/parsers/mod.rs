//! Format-specific parsers over untrusted input.
//!
//! # Error Handling Strategy
//!
//! All three parsers follow the same partial-failure policy:
//!
//! - **Record-level failures**: a record missing a required field (title,
//!   date) is skipped and counted; a record whose field is present but
//!   invalid is dropped with a diagnostic in [`ParseOutcome::issues`].
//!   Sibling records always continue.
//! - **Item-level failures**: an unrecognizable top-level shape (no usable
//!   columns, unterminated quoting) fails the whole item with a typed,
//!   descriptive error. The batch continues.
//! - **Fatal failures**: only the binary extractor can hit these - a
//!   length-prefixed segment overrunning its buffer is propagated as
//!   [`FatalError`](crate::error::FatalError) and aborts the batch, since
//!   partial output from a corrupt buffer is untrustworthy.

pub mod calendar;
pub mod photo;
pub mod tabular;

use crate::models::CanonicalEvent;

/// What one parser produced from one item: the surviving events, per-record
/// field diagnostics, and the count of records skipped for missing
/// required fields.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub events: Vec<CanonicalEvent>,
    pub issues: Vec<String>,
    pub records_skipped: usize,
}
