//! Hashing Error Types

use derive_more::{Display, Error};

/// A hashing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for hashing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Content named like an image could not be decoded as one.
    #[display("could not decode image: {_0}")]
    UndecodableImage(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes are either an image or they aren't.
        false
    }
}
