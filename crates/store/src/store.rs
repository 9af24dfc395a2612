//! The read/delete interface the scan engine needs from a catalog.

use crate::error::Result;
use crate::item::{ExtantItem, StoredHashes};
use async_trait::async_trait;
use std::path::Path;

/// Read-mostly view of the catalog used by the scan engine.
///
/// The engine never writes hashes through this trait; it only reads what is
/// already cataloged and, when a container has lost its whole-file record,
/// asks for every record under that path to be purged.
///
/// No locking is implied: two callers working on the same `base_path` at the
/// same time may observe each other's partial writes.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// All records whose base path is exactly `base_path`, including entries
    /// inside it when it is a container.
    async fn items_on_base_path(&self, base_path: &Path) -> Result<Vec<ExtantItem>>;

    /// Records matching the exact `(base_path, internal_name)` key.
    ///
    /// Expected to return at most one row when `internal_name` is empty, but
    /// implementations must return every matching row so that callers can
    /// detect integrity problems.
    async fn items_on_base_path_internal_path(&self, base_path: &Path, internal_name: &str) -> Result<Vec<ExtantItem>>;

    /// Stored hashes for one key. All fields are `None` if nothing is stored.
    async fn hashes(&self, base_path: &Path, internal_name: &str) -> Result<StoredHashes>;

    /// Remove every record under `base_path`. Returns the number of rows removed.
    async fn delete_base_path(&self, base_path: &Path) -> Result<u64>;
}
