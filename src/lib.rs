//! lifeweave - import personal-history exports into one event timeline
//!
//! This library pulls personal historical data out of several export
//! formats and normalizes everything into a single validated record model.
//! It supports:
//!
//! - Delimited text (CSV/TSV) with header auto-detection
//! - Calendar text with folded lines and escaped values
//! - Embedded photo metadata (capture time, camera fields, GPS)
//! - Two vendor JSON export families (location/calendar/notes and
//!   post/connection/event style)
//!
//! Every parser converges to [`CanonicalEvent`]: validated timestamp,
//! sanitized text, one of seven life-category layers. A batch import
//! returns an [`ImportResult`] - events, accumulated non-fatal errors, and
//! aggregate stats - and one malformed item never poisons its siblings.
//!
//! # Example
//!
//! ```
//! use lifeweave::models::{ImportItem, ImportOptions};
//! use lifeweave::pipeline::import_batch;
//!
//! let items = vec![ImportItem::text("events.csv", "Title,Date\nDinner,2021-06-05\n")];
//! let result = import_batch(&items, &ImportOptions::default())?;
//! assert_eq!(result.events.len(), 1);
//! # Ok::<(), lifeweave::error::FatalError>(())
//! ```

pub mod classify;
pub mod cli;
pub mod dates;
pub mod error;
pub mod models;
pub mod normalize;
pub mod parsers;
pub mod pipeline;
pub mod store;
pub mod validate;

// Re-export commonly used types
pub use error::{ErrorKind, FatalError, ImportError};
pub use models::{CanonicalEvent, GeoLocation, ImportItem, ImportOptions, ImportResult, Layer, Source};
pub use pipeline::{import_batch, import_json, import_text};
