//! Repository for catalog items.
//!
//! Every row is one `(base_path, internal_path)` pair. Whole-file records and
//! container entries live in the same table and are told apart only by the
//! internal path being empty.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::item::{CatalogEntry, DuplicateGroup, ExtantItem, HashedItem, StoredHashes};
use crate::models::{ItemRow, path_to_bytes};
use crate::store::MetadataStore;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use std::path::Path;
use time::UtcDateTime;

fn into_entries(rows: Vec<ItemRow>) -> Result<Vec<CatalogEntry>> {
    rows.into_iter().map(CatalogEntry::try_from).collect()
}

/// Repository for reading and writing catalog items.
///
/// Implements [`MetadataStore`] for the scan engine, and additionally exposes
/// the write and reporting queries used by whoever consumes scan results.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    ///
    /// In dry-run mode every read works as normal but writes and deletes
    /// report success without touching the database.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert or replace the record at the item's `(base_path, internal_name)`.
    pub async fn upsert(&self, item: &HashedItem) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let row = ItemRow::from_hashed(item, UtcDateTime::now())?;
        sqlx::query(include_str!("../queries/upsert_item.sql"))
            .bind(row.base_path)
            .bind(row.internal_path)
            .bind(row.item_hash)
            .bind(row.p_hash)
            .bind(row.d_hash)
            .bind(row.scanned_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Every catalog row under `base_path`.
    pub async fn entries_on_base_path(&self, base_path: impl AsRef<Path>) -> Result<Vec<CatalogEntry>> {
        let rows: Vec<ItemRow> = sqlx::query_as(include_str!("../queries/items_on_base_path.sql"))
            .bind(path_to_bytes(base_path.as_ref())?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        into_entries(rows)
    }

    /// Every catalog row with the exact `(base_path, internal_name)` key.
    pub async fn entries_on_key(
        &self,
        base_path: impl AsRef<Path>,
        internal_name: impl AsRef<str>,
    ) -> Result<Vec<CatalogEntry>> {
        let rows: Vec<ItemRow> = sqlx::query_as(include_str!("../queries/items_on_base_path_internal_path.sql"))
            .bind(path_to_bytes(base_path.as_ref())?)
            .bind(internal_name.as_ref())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        into_entries(rows)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Groups of rows that share a content hash, for exact-duplicate reports.
    ///
    /// Groups are ordered by hash, and rows within a group by location.
    pub async fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        let rows: Vec<ItemRow> = sqlx::query_as(include_str!("../queries/duplicate_groups.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for entry in into_entries(rows)? {
            let hash = entry.content_hash.clone().unwrap_or_default();
            match groups.last_mut() {
                Some(group) if group.content_hash == hash => group.items.push(entry),
                _ => groups.push(DuplicateGroup { content_hash: hash, items: vec![entry] }),
            }
        }
        Ok(groups)
    }

    /// Every row that carries a perceptual hash, for near-duplicate search.
    pub async fn image_hashes(&self) -> Result<Vec<CatalogEntry>> {
        let rows: Vec<ItemRow> = sqlx::query_as(include_str!("../queries/image_hashes.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        into_entries(rows)
    }

    /// Total number of catalog rows.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_items.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("row count"))
    }
}

#[async_trait]
impl MetadataStore for Repository {
    async fn items_on_base_path(&self, base_path: &Path) -> Result<Vec<ExtantItem>> {
        let entries = self.entries_on_base_path(base_path).await?;
        Ok(entries.into_iter().map(ExtantItem::from).collect())
    }

    async fn items_on_base_path_internal_path(&self, base_path: &Path, internal_name: &str) -> Result<Vec<ExtantItem>> {
        let entries = self.entries_on_key(base_path, internal_name).await?;
        Ok(entries.into_iter().map(ExtantItem::from).collect())
    }

    async fn hashes(&self, base_path: &Path, internal_name: &str) -> Result<StoredHashes> {
        let entries = self.entries_on_key(base_path, internal_name).await?;
        Ok(entries.first().map(StoredHashes::from).unwrap_or_default())
    }

    async fn delete_base_path(&self, base_path: &Path) -> Result<u64> {
        if self.dry_run {
            return Ok(0);
        }
        let result = sqlx::query(include_str!("../queries/delete_base_path.sql"))
            .bind(path_to_bytes(base_path)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }
}
