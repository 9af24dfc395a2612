//! SQLite metadata store for the hash catalog.
//!
//! The store tracks every cataloged item: plain files, whole containers, and
//! the entries inside those containers. The catalog is not the source of
//! truth (the files on disk are). If the database is deleted, it can be
//! rebuilt by scanning again.
//!
//! # Architecture
//! Each row is keyed by `(base_path, internal_path)`:
//! - **Whole-file records** have an empty internal path. For a container this
//!   is the hash of the container file itself.
//! - **Entry records** name a file inside a container by its internal path.
//!
//! The scan engine only talks to the store through the [`MetadataStore`]
//! trait; writing results back is the caller's job ([`Repository::upsert`]).

mod db;
pub mod error;
mod item;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod repo;
mod store;

pub use crate::db::Database;
pub use crate::item::{CatalogEntry, DuplicateGroup, ExtantItem, HashedItem, StoredHashes};
#[cfg(feature = "mock")]
pub use crate::mock::MockStore;
pub use crate::repo::Repository;
pub use crate::store::MetadataStore;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn MetadataStore + Send + Sync>;
