//! # Domain Error Types
//!
//! Errors produced by pure normalization and validation. These are
//! per-field failures: the caller skips the offending field and keeps
//! processing the rest of the event.

use thiserror::Error;

/// Errors from numeric/unit normalization.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// The reading is NaN or infinite and cannot be stored.
    #[error("value is not a finite number")]
    NonFinite,

    /// A coordinate fell outside its valid range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Result type for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;
