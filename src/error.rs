//! Error types for the import pipeline.
//!
//! Two families with different lifecycles:
//!
//! - [`ImportError`] — non-fatal. One malformed item (or one bad field inside
//!   an otherwise-recognized record) is reported and skipped; sibling records
//!   and sibling items keep going. These accumulate in the
//!   [`ImportResult`](crate::models::ImportResult) error list.
//! - [`FatalError`] — an internal invariant was violated and partial output
//!   would be untrustworthy. Propagated to the caller via `Result`, never
//!   swallowed and never added to the error list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which policy produced a non-fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Top-level shape unrecognized (no usable columns, JSON matches no
    /// known export shape). One per item.
    Format,
    /// A single field inside a recognized record failed validation; that
    /// record is dropped, siblings continue.
    Field,
    /// The whole item exceeded a byte/character ceiling and was rejected
    /// before parsing.
    Size,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Format => "format",
            ErrorKind::Field => "field",
            ErrorKind::Size => "size",
        }
    }
}

/// A non-fatal, per-item diagnostic accumulated into the import result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    /// Name of the item the error belongs to.
    pub item: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ImportError {
    pub fn format(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self { item: item.into(), kind: ErrorKind::Format, message: message.into() }
    }

    pub fn field(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self { item: item.into(), kind: ErrorKind::Field, message: message.into() }
    }

    pub fn size(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self { item: item.into(), kind: ErrorKind::Size, message: message.into() }
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.item, self.kind.as_str(), self.message)
    }
}

/// Errors that abort an entire batch.
#[derive(Debug, Error)]
pub enum FatalError {
    /// A length-prefixed segment claims more bytes than remain in the
    /// buffer. Reading on would be out of bounds; clamping would hide
    /// corruption, so the batch stops here.
    #[error(
        "segment at offset {offset} declares {declared} bytes but only {remaining} remain in {item}"
    )]
    SegmentOverrun { item: String, offset: usize, declared: usize, remaining: usize },

    /// Any other violated internal invariant.
    #[error("internal invariant violated in {item}: {message}")]
    Invariant { item: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_display_includes_kind_and_item() {
        let err = ImportError::field("notes.json", "unresolvable date: 99/99/2021");
        assert_eq!(err.to_string(), "notes.json [field]: unresolvable date: 99/99/2021");
    }

    #[test]
    fn test_fatal_error_names_limit_and_offsets() {
        let err = FatalError::SegmentOverrun {
            item: "IMG_0001.jpg".to_string(),
            offset: 2,
            declared: 65535,
            remaining: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("65535"));
        assert!(msg.contains("12"));
        assert!(msg.contains("IMG_0001.jpg"));
    }
}
