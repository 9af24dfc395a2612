//! The concurrent scan engine.
//!
//! A [`PoolSupervisor`] runs a fixed number of workers. Each worker pulls a
//! [`Task`] from a shared [`TaskSource`], decides from the catalog whether
//! the path needs hashing at all, and pushes zero or more [`ResultRecord`]s
//! to a shared [`ResultSink`]. The engine only ever *reads* the catalog
//! (plus one delete, for containers it is about to re-catalog); persisting
//! results is up to whoever consumes the sink.
//!
//! # Decisions
//!
//! | Path | Catalog says | Outcome |
//! |---|---|---|
//! | under a disallowed root | - | task-fatal error |
//! | container (`zip`, `cbz`, `rar`, `cbr`, `7z`, `cb7`) | no whole-container record | whole hash, then every entry |
//! | container | one record, verification off | `Skipped` |
//! | container | one record, same hash | `HashMatch` |
//! | container | one record, different hash | every entry (whole hash not re-emitted) |
//! | container | several records | task-fatal error |
//! | anything else | every row hashed | `Skipped` |
//! | image | perceptual hashes stored | `Skipped` |
//! | image | otherwise | content + perceptual hashes |
//! | other | no hashed whole-file row | content hash |
//! | other | otherwise | `Skipped` |
//!
//! # Shutdown
//!
//! [`PoolSupervisor::graceful_shutdown`] lets workers drain the queue;
//! [`PoolSupervisor::halt_early`] makes them stop after their current step;
//! [`PoolSupervisor::close`] aborts them outright.

mod archive;
mod blocking;
mod channel;
mod decision;
pub mod error;
mod options;
mod route;
mod state;
mod supervisor;
#[cfg(test)]
mod testing;
mod worker;

pub use crate::channel::{ResultRecord, ResultSender, ResultSink, Task, TaskQueue, TaskSource, result_channel, task_queue};
pub use crate::options::{Collaborators, DEFAULT_POLL_INTERVAL, ScanOptions};
pub use crate::route::{ARCHIVE_EXTENSIONS, Route, has_archive_extension};
pub use crate::state::RunState;
pub use crate::supervisor::{PoolReport, PoolSupervisor};
pub use crate::worker::WorkerExit;
