//! Time Key Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A time key error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for time key operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The value is not shaped like `YYYY-MM-DDTHH-MM`.
    #[display("malformed time key: {_0}")]
    Malformed(#[error(not(source))] String),
    /// The value is shaped like a key but names no real date and time. Only
    /// raised by strict validation.
    #[display("time key is not a calendar date: {_0}")]
    NotCalendar(#[error(not(source))] String),
    /// A free-form timestamp could not be understood.
    #[display("unrecognised timestamp: {_0}")]
    Timestamp(#[error(not(source))] String),
    /// The date cannot be written with a four digit year.
    #[display("year out of range: {_0}")]
    YearOutOfRange(#[error(not(source))] i32),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Parsing is pure; the same input fails the same way every time.
        false
    }
}
