//! Data models for the import pipeline.
//!
//! - [`CanonicalEvent`] - the single normalized record shape every parser
//!   converges to, with its [`Layer`], [`Source`], and [`GeoLocation`] parts
//! - [`ImportItem`] / [`Payload`] - raw input items handed to the pipeline
//! - [`ImportResult`] / [`ImportStats`] - the output triple of every entry
//!   point and its aggregate counters
//! - [`ImportOptions`] - caller-supplied knobs (date order, extra keywords,
//!   ceilings)

pub mod event;
pub mod import;

pub use event::{CanonicalEvent, EventConstraint, GeoLocation, Layer, Source};
pub use import::{ImportItem, ImportOptions, ImportResult, ImportStats, ItemHint, Payload};
