//! In-memory metadata store for testing.

use crate::error::{ErrorKind, Result};
use crate::item::{ExtantItem, HashedItem, StoredHashes};
use crate::store::MetadataStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory metadata store for testing.
///
/// Rows live in a `Vec` behind a [`RwLock`]. Unlike the SQLite catalog there
/// is no uniqueness constraint, so tests can seed the store with states a
/// real database would refuse (such as two whole-file records for the same
/// container).
///
/// # Examples
///
/// ```
/// use hashscan_store::{MetadataStore, MockStore};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MockStore::with_items([("/lib/a.zip", "", "aaaa"), ("/lib/a.zip", "one.txt", "bbbb")]);
/// let items = store.items_on_base_path(Path::new("/lib/a.zip")).await.unwrap();
/// assert_eq!(items.len(), 2);
/// # }
/// ```
#[derive(Default)]
pub struct MockStore {
    rows: RwLock<Vec<HashedItem>>,
    deleted: RwLock<Vec<PathBuf>>,
    queries: AtomicUsize,
    failing: AtomicBool,
}

impl MockStore {
    /// Create a mock store pre-populated with `(base_path, internal_name,
    /// content_hash)` rows. An empty hash models a row without a hash.
    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let rows = items
            .into_iter()
            .map(|(base, internal, hash)| HashedItem {
                base_path: PathBuf::from(base),
                internal_name: internal.to_string(),
                content_hash: hash.to_string(),
                phash: None,
                dhash: None,
            })
            .collect();
        Self { rows: RwLock::new(rows), ..Default::default() }
    }

    /// Make every subsequent call fail with [`ErrorKind::Database`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Append a row without replacing existing rows at the same key.
    pub async fn push(&self, item: HashedItem) {
        self.rows.write().await.push(item);
    }

    /// Insert or replace the row at the item's key, like the SQLite catalog.
    pub async fn upsert(&self, item: &HashedItem) {
        let mut rows = self.rows.write().await;
        rows.retain(|r| !(r.base_path == item.base_path && r.internal_name == item.internal_name));
        rows.push(item.clone());
    }

    /// Snapshot of every row currently stored.
    pub async fn rows(&self) -> Vec<HashedItem> {
        self.rows.read().await.clone()
    }

    /// Every base path passed to [`delete_base_path`](MetadataStore::delete_base_path).
    pub async fn deleted(&self) -> Vec<PathBuf> {
        self.deleted.read().await.clone()
    }

    /// Number of read queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Database);
        }
        Ok(())
    }

    async fn matching(&self, predicate: impl Fn(&HashedItem) -> bool) -> Result<Vec<HashedItem>> {
        self.check()?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.read().await.iter().filter(|r| predicate(r)).cloned().collect())
    }
}

fn to_extant(item: HashedItem) -> ExtantItem {
    ExtantItem {
        base_path: item.base_path,
        internal_name: item.internal_name,
        content_hash: item.content_hash,
    }
}

#[async_trait]
impl MetadataStore for MockStore {
    async fn items_on_base_path(&self, base_path: &Path) -> Result<Vec<ExtantItem>> {
        let rows = self.matching(|r| r.base_path == base_path).await?;
        Ok(rows.into_iter().map(to_extant).collect())
    }

    async fn items_on_base_path_internal_path(&self, base_path: &Path, internal_name: &str) -> Result<Vec<ExtantItem>> {
        let rows = self.matching(|r| r.base_path == base_path && r.internal_name == internal_name).await?;
        Ok(rows.into_iter().map(to_extant).collect())
    }

    async fn hashes(&self, base_path: &Path, internal_name: &str) -> Result<StoredHashes> {
        let rows = self.matching(|r| r.base_path == base_path && r.internal_name == internal_name).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| StoredHashes {
                content_hash: Some(r.content_hash).filter(|h| !h.is_empty()),
                phash: r.phash,
                dhash: r.dhash,
            })
            .unwrap_or_default())
    }

    async fn delete_base_path(&self, base_path: &Path) -> Result<u64> {
        self.check()?;
        self.deleted.write().await.push(base_path.to_path_buf());
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.base_path != base_path);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_whole_file_rows_are_kept() {
        let store = MockStore::with_items([("/a.zip", "", "one"), ("/a.zip", "", "two")]);
        let rows = store.items_on_base_path_internal_path(Path::new("/a.zip"), "").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_records_call() {
        let store = MockStore::with_items([("/a.zip", "x", "one"), ("/b.zip", "", "two")]);
        assert_eq!(store.delete_base_path(Path::new("/a.zip")).await.unwrap(), 1);
        assert_eq!(store.deleted().await, vec![PathBuf::from("/a.zip")]);
        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MockStore::default();
        store.set_failing(true);
        let err = store.items_on_base_path(Path::new("/a")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = MockStore::with_items([("/a.png", "", "old")]);
        let item = HashedItem {
            base_path: PathBuf::from("/a.png"),
            internal_name: String::new(),
            content_hash: "new".to_string(),
            phash: Some("p".to_string()),
            dhash: Some("d".to_string()),
        };
        store.upsert(&item).await;
        let hashes = store.hashes(Path::new("/a.png"), "").await.unwrap();
        assert_eq!(hashes.content_hash.as_deref(), Some("new"));
        assert!(hashes.has_perceptual());
    }
}
