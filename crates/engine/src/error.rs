//! Engine Error Types
//!
//! Errors raised while processing a task fall into two groups. Task-fatal
//! errors terminate the worker that hit them; every other error is logged
//! and the worker moves on to its next task. See [`ErrorKind::is_task_fatal`].

use derive_more::{Display, Error};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The pool was asked to start with an unusable setting.
    #[display("invalid pool configuration: {_0}")]
    InvalidConfig(#[error(not(source))] &'static str),
    /// The task's path lies under a root that must never be scanned.
    #[display("path is under a disallowed root: {_0}")]
    DisallowedPath(#[error(not(source))] String),
    /// The catalog holds more than one whole-container record for a path.
    #[display("{count} whole-container records for {path}")]
    DuplicateContainerRecord { path: String, count: usize },
    /// The metadata store could not be read or updated.
    #[display("metadata store failure")]
    Store,
    /// The file could not be read (moved, deleted, permissions).
    #[display("I/O error")]
    Io,
    /// Hashing failed, usually because image content would not decode.
    #[display("hashing failed")]
    Hash,
    /// The media type of the file could not be determined.
    #[display("type sniffing failed")]
    Sniff,
    /// The container could not be opened, or one of its entries is corrupt.
    #[display("archive failure")]
    Archive,
    /// Blocking work was cancelled because the runtime is shutting down.
    #[display("cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Store | ErrorKind::Io)
    }

    /// Returns `true` if the error must terminate the worker that raised it.
    pub fn is_task_fatal(&self) -> bool {
        matches!(self, ErrorKind::DisallowedPath(_) | ErrorKind::DuplicateContainerRecord { .. } | ErrorKind::Store)
    }
}
