//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Callers are expected to branch on the kind: [`InvalidPath`] and
//! [`InvalidTimeKey`] are the client's fault, [`NotFound`] is an ordinary
//! miss, and only [`Storage`] means something is actually wrong.
//!
//! [`InvalidPath`]: ErrorKind::InvalidPath
//! [`InvalidTimeKey`]: ErrorKind::InvalidTimeKey
//! [`NotFound`]: ErrorKind::NotFound
//! [`Storage`]: ErrorKind::Storage

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A station or filename segment was rejected by path validation.
    #[display("invalid path segment: {_0:?}")]
    InvalidPath(#[error(not(source))] String),
    /// A query time key or timestamp could not be parsed.
    #[display("invalid time key: {_0:?}")]
    InvalidTimeKey(#[error(not(source))] String),
    /// The requested recording is not in the archive (any more).
    #[display("recording not found: {station}/{filename}")]
    NotFound { station: String, filename: String },
    /// The archive could not be read.
    #[display("archive storage failure")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }

    /// Returns `true` if the caller sent something unusable.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidPath(_) | Self::InvalidTimeKey(_))
    }
}
