//! Error types for strict record conversions.

use thiserror::Error;

/// Errors raised by the strict (`TryFrom`) record conversions.
///
/// The lenient `parse` functions never return these; they fall back to the
/// empty sentinel instead.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The source was not a non-empty map.
    #[error("Record source is not a non-empty map")]
    NotAMap,

    /// A required field was missing, empty, or of the wrong type.
    #[error("Missing or invalid field: {0}")]
    MissingField(&'static str),

    /// An error kind name was not recognized.
    #[error("Unknown error kind: {0}")]
    UnknownKind(String),
}

/// Result type for record conversions.
pub type RecordResult<T> = std::result::Result<T, RecordError>;
