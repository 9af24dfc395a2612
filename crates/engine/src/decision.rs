//! The per-task decision: what, if anything, needs hashing for one path.

use crate::archive::ArchiveScanner;
use crate::blocking::blocking;
use crate::channel::{ResultRecord, ResultSink, Task};
use crate::error::{ErrorKind, Result};
use crate::options::{Collaborators, ScanOptions};
use crate::route::{ContainerRecord, Route, has_archive_extension};
use crate::state::RunState;
use exn::ResultExt;
use hashscan_hasher::{HashComputer, Hashes};
use hashscan_store::{HashedItem, StoreHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Everything one worker needs to process tasks, shared by the whole pool.
pub(crate) struct ScanContext {
    pub(crate) options: ScanOptions,
    pub(crate) state: RunState,
    pub(crate) sink: Arc<dyn ResultSink>,
    store: StoreHandle,
    hasher: Arc<dyn HashComputer>,
    archives: ArchiveScanner,
}

impl ScanContext {
    pub(crate) fn new(options: ScanOptions, state: RunState, sink: Arc<dyn ResultSink>, with: Collaborators) -> Self {
        Self {
            options,
            state,
            sink,
            store: with.store,
            hasher: Arc::clone(&with.hasher),
            archives: ArchiveScanner { sniffer: with.sniffer, opener: with.opener, hasher: with.hasher },
        }
    }

    fn emit(&self, record: ResultRecord) {
        self.sink.push(record);
    }

    fn emit_hashes(&self, path: &Path, hashes: Hashes) {
        self.emit(ResultRecord::Hashed(HashedItem {
            base_path: path.to_path_buf(),
            internal_name: hashes.internal_name,
            content_hash: hashes.content_hash,
            phash: hashes.phash,
            dhash: hashes.dhash,
        }));
    }

    /// Process one task, emitting its records.
    ///
    /// Errors are either task-fatal (see [`ErrorKind::is_task_fatal`]) or
    /// should simply be logged; either way no record describes them.
    #[instrument(level = "debug", skip_all, fields(path = %task.base_path.display()))]
    pub(crate) async fn process(&self, task: &Task) -> Result<()> {
        let path = task.base_path.as_path();
        if self.options.is_disallowed(path) {
            exn::bail!(ErrorKind::DisallowedPath(path.display().to_string()));
        }
        let items = if has_archive_extension(path) {
            Vec::new()
        } else {
            self.store.items_on_base_path(path).await.or_raise(|| ErrorKind::Store)?
        };
        match Route::decide(path, &items) {
            Route::Archive => self.archive_decision(path).await,
            Route::AlreadyCataloged => {
                self.emit(ResultRecord::Skipped);
                Ok(())
            },
            Route::Image => self.image_decision(path).await,
            Route::BareFile => self.hash_file(path, self.options.compute_perceptual_hash).await,
            Route::Anomalous => {
                tracing::debug!(path = %path.display(), "Whole-file hash present but other rows are not hashed, skipping");
                self.emit(ResultRecord::Skipped);
                Ok(())
            },
        }
    }

    async fn archive_decision(&self, path: &Path) -> Result<()> {
        let records = self.store.items_on_base_path_internal_path(path, "").await.or_raise(|| ErrorKind::Store)?;
        let contents = match ContainerRecord::from(records) {
            ContainerRecord::Missing => {
                self.store.delete_base_path(path).await.or_raise(|| ErrorKind::Store)?;
                let (hashes, contents) = self.whole_file_hash(path).await?;
                self.emit_hashes(path, hashes);
                contents
            },
            ContainerRecord::One(_) if !self.options.verify_archive_integrity => {
                self.emit(ResultRecord::Skipped);
                return Ok(());
            },
            ContainerRecord::One(stored) => {
                let (hashes, contents) = self.whole_file_hash(path).await?;
                if hashes.content_hash == stored {
                    self.emit(ResultRecord::HashMatch);
                    return Ok(());
                }
                // Only the entries are re-emitted; the stored whole-file hash stays.
                tracing::warn!(
                    path = %path.display(),
                    stored = %stored,
                    current = %hashes.content_hash,
                    "Container changed since it was cataloged, rescanning entries",
                );
                contents
            },
            ContainerRecord::Many(count) => {
                exn::bail!(ErrorKind::DuplicateContainerRecord { path: path.display().to_string(), count })
            },
        };
        let emitted = self
            .archives
            .scan(path, Some(contents), self.options.compute_perceptual_hash, &self.state, &self.sink)
            .await?;
        tracing::debug!(path = %path.display(), emitted, "Container entries hashed");
        Ok(())
    }

    async fn image_decision(&self, path: &Path) -> Result<()> {
        let stored = self.store.hashes(path, "").await.or_raise(|| ErrorKind::Store)?;
        if stored.has_perceptual() {
            self.emit(ResultRecord::Skipped);
            return Ok(());
        }
        self.hash_file(path, true).await
    }

    async fn hash_file(&self, path: &Path, perceptual: bool) -> Result<()> {
        let bytes = tokio::fs::read(path).await.or_raise(|| ErrorKind::Io)?;
        let hasher = Arc::clone(&self.hasher);
        let owned = path.to_path_buf();
        let hashes = blocking(move || hasher.compute(&owned, "", &bytes, perceptual))
            .await?
            .or_raise(|| ErrorKind::Hash)?;
        self.emit_hashes(path, hashes);
        Ok(())
    }

    /// Read the whole container and hash it, handing back the bytes so the
    /// entry scan doesn't read the file again.
    async fn whole_file_hash(&self, path: &Path) -> Result<(Hashes, Vec<u8>)> {
        let bytes = tokio::fs::read(path).await.or_raise(|| ErrorKind::Io)?;
        let hasher = Arc::clone(&self.hasher);
        let owned: PathBuf = path.to_path_buf();
        let (hashes, bytes) = blocking(move || {
            let hashes = hasher.compute(&owned, "", &bytes, false);
            (hashes, bytes)
        })
        .await?;
        Ok((hashes.or_raise(|| ErrorKind::Hash)?, bytes))
    }
}
