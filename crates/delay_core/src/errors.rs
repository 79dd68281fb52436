//! Error types for the delay core crate

use thiserror::Error;

/// Errors that can occur while deriving features, encoding or scoring
#[derive(Error, Debug)]
pub enum CoreError {
    /// Date string could not be parsed
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Time string could not be parsed
    #[error("invalid time '{0}': expected HH:MM")]
    InvalidTime(String),

    /// Weather flag outside of {0, 1}
    #[error("invalid weather condition {0}: expected 0 (clear) or 1 (bad)")]
    InvalidWeather(i64),

    /// Category value not present in the training vocabulary
    #[error("Error: '{value}' is an unknown category for {column}. It was not present in the training data.")]
    UnknownCategory { column: String, value: String },

    /// Model or bundle failed structural validation
    #[error("model validation failed: {0}")]
    ValidationFailed(String),

    /// Stored hash does not match the bundle contents
    #[error("hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// True when the error is an unseen categorical value
    pub fn is_unknown_category(&self) -> bool {
        matches!(self, CoreError::UnknownCategory { .. })
    }
}

/// Result type for delay core operations
pub type Result<T> = std::result::Result<T, CoreError>;
