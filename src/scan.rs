//! The `scan` command: discovery feeding the worker pool, results persisted
//! as they arrive.

use crate::cli::ScanArgs;
use crate::discover::{Discovery, discover};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use hashscan_config::Config;
use hashscan_engine::{Collaborators, PoolReport, PoolSupervisor, ResultRecord, ScanOptions, result_channel, task_queue};
use hashscan_store::{Database, Repository, StoreHandle};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::instrument;

/// Running totals of the records a scan produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub hashed: u64,
    pub skipped: u64,
    pub matched: u64,
    /// Hashed records the catalog refused to store.
    pub unsaved: u64,
}

#[derive(Debug)]
pub struct ScanSummary {
    pub discovery: Discovery,
    pub tally: Tally,
    /// `None` if the scan was interrupted.
    pub pool: Option<PoolReport>,
}

pub fn scan_options(config: &Config) -> ScanOptions {
    ScanOptions {
        compute_perceptual_hash: config.perceptual_hash,
        verify_archive_integrity: config.verify_archive_integrity,
        disallowed_roots: config.disallowed_roots.clone(),
        poll_interval: config.poll_interval(),
    }
}

/// Write every hashed record to the catalog until all senders are gone.
pub async fn persist(repo: Repository, mut results: UnboundedReceiver<ResultRecord>) -> Tally {
    let mut tally = Tally::default();
    while let Some(record) = results.recv().await {
        match record {
            ResultRecord::Hashed(item) => match repo.upsert(&item).await {
                Ok(()) => tally.hashed += 1,
                Err(err) => {
                    tracing::error!(path = %item.base_path.display(), entry = %item.internal_name, error = ?err, "Could not save hashes");
                    tally.unsaved += 1;
                },
            },
            ResultRecord::Skipped => tally.skipped += 1,
            ResultRecord::HashMatch => tally.matched += 1,
        }
    }
    tally
}

#[instrument(level = "info", skip_all, fields(roots = args.roots.len(), workers = config.workers))]
pub async fn run(config: &Config, args: &ScanArgs) -> Result<ScanSummary> {
    let db = crate::open_catalog(config).await?;
    let summary = scan_with(&db, config, args).await;
    db.close().await;
    summary
}

async fn scan_with(db: &Database, config: &Config, args: &ScanArgs) -> Result<ScanSummary> {
    let repo = Repository::new(db.pool().clone(), args.dry_run);
    let store: StoreHandle = Arc::new(repo.clone());
    let (tx, queue) = task_queue(config.queue_capacity);
    let (sink, results) = result_channel();
    let persister = tokio::spawn(persist(repo, results));

    let pool = PoolSupervisor::start(
        config.workers,
        scan_options(config),
        Arc::new(queue),
        Arc::new(sink),
        Collaborators::new(store),
    )
    .or_raise(|| ErrorKind::Scan)?;

    let walk = discover(args.roots.clone(), tx, pool.state().clone());
    let discovery = tokio::select! {
        found = walk => Some(found),
        _ = tokio::signal::ctrl_c() => None,
    };
    let (discovery, pool) = match discovery {
        Some(found) => {
            tracing::info!(queued = found.queued, "Discovery complete, draining queue");
            let report = tokio::select! {
                report = pool.graceful_shutdown() => Some(report),
                // Dropping the shutdown future drops the pool, which halts the run
                // and aborts its workers.
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted while draining, aborting workers");
                    None
                },
            };
            (found, report)
        },
        None => {
            tracing::warn!("Interrupted, stopping workers");
            pool.halt_early();
            pool.close().await;
            (Discovery::default(), None)
        },
    };

    let tally = persister.await.or_raise(|| ErrorKind::Scan)?;
    Ok(ScanSummary { discovery, tally, pool })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashscan_store::{HashedItem, MetadataStore};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn item(path: &str) -> HashedItem {
        HashedItem {
            base_path: PathBuf::from(path),
            internal_name: String::new(),
            content_hash: "abcd".to_string(),
            phash: None,
            dhash: None,
        }
    }

    #[tokio::test]
    async fn test_persist_counts_and_saves() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let (sink, rx) = result_channel();
        for record in [ResultRecord::Hashed(item("/a.txt")), ResultRecord::Skipped, ResultRecord::HashMatch, ResultRecord::Skipped] {
            hashscan_engine::ResultSink::push(&sink, record);
        }
        drop(sink);

        let tally = persist(repo.clone(), rx).await;
        assert_eq!(tally, Tally { hashed: 1, skipped: 2, matched: 1, unsaved: 0 });
        assert_eq!(repo.count().await.unwrap(), 1);
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scan_then_rescan_is_incremental() {
        let library = TempDir::new().unwrap();
        std::fs::write(library.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(library.path().join("b.txt"), b"beta").unwrap();
        std::fs::write(library.path().join("copy-of-a.txt"), b"alpha").unwrap();
        let state = TempDir::new().unwrap();
        let config = Config {
            database: state.path().join("catalog.sqlite"),
            workers: 2,
            disallowed_roots: vec![],
            poll_interval_ms: 20,
            ..Config::default()
        };
        let args = ScanArgs {
            roots: vec![library.path().to_path_buf()],
            workers: None,
            no_phash: false,
            no_verify: false,
            dry_run: false,
        };

        let first = run(&config, &args).await.unwrap();
        assert_eq!(first.discovery.queued, 3);
        assert_eq!(first.tally.hashed, 3);
        assert!(first.pool.unwrap().is_clean());

        let second = run(&config, &args).await.unwrap();
        assert_eq!(second.tally, Tally { hashed: 0, skipped: 3, matched: 0, unsaved: 0 });

        let db = Database::connect(&config.database, config.workers).await.unwrap();
        let repo = Repository::from(&db);
        let groups = repo.duplicate_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 2);
        let items = repo.items_on_base_path(&library.path().join("b.txt")).await.unwrap();
        assert_eq!(items.len(), 1);
        db.close().await;
    }
}
