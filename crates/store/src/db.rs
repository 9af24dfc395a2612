//! Catalog database: connection pool, pragmas and migrations.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connections on top of one per scan worker: the result writer, plus one
/// for whoever reads while both are busy.
const EXTRA_CONNECTIONS: u32 = 2;
const MAX_CONNECTIONS: u32 = 32;

/// Every scan worker holds at most one connection at a time (a lookup or
/// the container delete), so the pool grows with the worker count.
fn pool_size(workers: usize) -> u32 {
    u32::try_from(workers)
        .unwrap_or(MAX_CONNECTIONS)
        .saturating_add(EXTRA_CONNECTIONS)
        .min(MAX_CONNECTIONS)
}

/// Connection pool for the catalog.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn open(options: SqliteConnectOptions, connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based pragmas only reach the connection they run on.
            .after_connect(|conn, meta| Box::pin(async move { Self::tune(conn, meta).await }))
            .max_connections(connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the catalog at `path` for a run with `workers` scan workers,
    /// creating the file and applying migrations as needed.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display(), workers = workers))]
    pub async fn connect(path: impl AsRef<Path>, workers: usize) -> Result<Self> {
        let options = Self::options().filename(path.as_ref()).create_if_missing(true);
        Self::open(options, pool_size(workers)).await
    }

    /// Open a private in-memory catalog.
    ///
    /// Not behind `#[cfg(test)]`: other crates' tests use it too. Each
    /// connection to `:memory:` is its own database, so the pool holds one.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(Self::options().filename(":memory:"), 1).await
    }

    fn options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Workers read while the result writer upserts.
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLITE_BUSY past this reaches the engine as a task-fatal store failure.
            .busy_timeout(Duration::from_secs(5))
    }

    async fn tune(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -16384;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("migrating catalog", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection. The database must not be used afterwards.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(1, 3)]
    #[case(8, 10)]
    #[case(30, 32)]
    #[case(500, 32)]
    fn test_pool_size(#[case] workers: usize, #[case] expected: u32) {
        assert_eq!(pool_size(workers), expected);
    }

    #[tokio::test]
    async fn test_items_schema() {
        let db = Database::connect_in_memory().await.unwrap();
        let columns: Vec<(String, String)> = sqlx::query_as("SELECT name, type FROM pragma_table_info('items') ORDER BY cid")
            .fetch_all(db.pool())
            .await
            .unwrap();
        let columns: Vec<(&str, &str)> = columns.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();
        assert_eq!(
            columns,
            vec![
                ("id", "INTEGER"),
                ("base_path", "BLOB"),
                ("internal_path", "TEXT"),
                ("item_hash", "TEXT"),
                ("p_hash", "TEXT"),
                ("d_hash", "TEXT"),
                ("scanned_at", "INTEGER"),
            ]
        );

        let indexes: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'items' AND sql IS NOT NULL ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(indexes, vec![("items_base_path".to_string(),), ("items_item_hash".to_string(),)]);

        let unique: Vec<(i64,)> = sqlx::query_as("SELECT \"unique\" FROM pragma_index_list('items') WHERE origin = 'u'")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(unique, vec![(1,)], "(base_path, internal_path) must be unique");
        db.close().await;
    }

    #[tokio::test]
    async fn test_file_catalog_is_reopened() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.sqlite");
        let db = Database::connect(&path, 4).await.unwrap();
        let mode: (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode.0, "wal");
        let cache: (i64,) = sqlx::query_as("PRAGMA cache_size").fetch_one(db.pool()).await.unwrap();
        assert_eq!(cache.0, -16384);
        assert_eq!(db.pool().options().get_max_connections(), 6);
        db.close().await;

        // Migrations already applied are skipped.
        let db = Database::connect(&path, 1).await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
    }
}
