//! Error types for portal-core.
//!
//! All errors are explicit and designed to cross the wasm boundary cleanly.
//! Implements `std::error::Error` manually.
//!
//! # Error Categories
//!
//! - **Validation errors**: `MissingField`, `MissingFile`, `MissingVideoUrl`, `InvalidMonth`
//! - **Parse errors**: `InvalidDate`, `UnknownContentKind`, `InvalidFilter`
//! - **Payload errors**: `PayloadTooLarge`

use std::error::Error as StdError;
use std::fmt;

/// Result type alias for portal-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating or interpreting portal records.
///
/// Every variant maps to a user-facing message; none of them involve
/// the store, which is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ==================== Validation Errors ====================
    /// A required text field was empty or absent.
    MissingField {
        /// Name of the field as it appears in the record.
        field: &'static str,
    },

    /// A document or video file is required when creating a record.
    MissingFile,

    /// The chosen video source needs a URL and none was given.
    MissingVideoUrl {
        /// Source label ("YouTube" or "Google Drive").
        source_label: &'static str,
    },

    /// Month value is not in `YYYY-MM` form.
    InvalidMonth {
        /// The rejected value.
        value: String,
    },

    // ==================== Parse Errors ====================
    /// Date value is neither `YYYY-MM-DD` nor RFC 3339.
    InvalidDate {
        /// The rejected value.
        value: String,
    },

    /// Content collection name is not one of notes, tutes or videos.
    UnknownContentKind {
        /// The rejected value.
        value: String,
    },

    /// A list filter value is not recognised.
    InvalidFilter {
        /// Filter name (`access`, `month`, `type`).
        filter: &'static str,
        /// The rejected value.
        value: String,
    },

    // ==================== Payload Errors ====================
    /// Inline payload exceeds the allowed size.
    PayloadTooLarge {
        /// Decoded payload size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingField { field } => write!(f, "{} is required", field),
            Error::MissingFile => write!(f, "please upload a file"),
            Error::MissingVideoUrl { source_label } => {
                write!(f, "please enter a {} URL", source_label)
            }
            Error::InvalidMonth { value } => {
                write!(f, "invalid month '{}': expected YYYY-MM", value)
            }
            Error::InvalidDate { value } => {
                write!(f, "invalid date '{}': expected YYYY-MM-DD", value)
            }
            Error::UnknownContentKind { value } => {
                write!(f, "unknown content collection: {}", value)
            }
            Error::InvalidFilter { filter, value } => {
                write!(f, "invalid {} filter: {}", filter, value)
            }
            Error::PayloadTooLarge { size, max } => {
                write!(
                    f,
                    "payload too large: {} bytes exceeds maximum {}",
                    size, max
                )
            }
        }
    }
}

impl StdError for Error {}
