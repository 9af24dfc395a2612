//! Full rescan of a container's entries.

use crate::blocking::blocking;
use crate::channel::{ResultRecord, ResultSink};
use crate::error::{ErrorKind, Result};
use crate::state::RunState;
use exn::ResultExt;
use hashscan_archive::{ArchiveOpener, ArchiveReader, TypeSniffer};
use hashscan_hasher::HashComputer;
use hashscan_store::HashedItem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Closes the wrapped reader when dropped, whichever way the scan ends.
struct OpenReader(Box<dyn ArchiveReader>);

impl Drop for OpenReader {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Hashes every entry of a supported container and emits one
/// [`ResultRecord::Hashed`] per entry.
#[derive(Clone)]
pub(crate) struct ArchiveScanner {
    pub(crate) sniffer: Arc<dyn TypeSniffer>,
    pub(crate) opener: Arc<dyn ArchiveOpener>,
    pub(crate) hasher: Arc<dyn HashComputer>,
}

impl ArchiveScanner {
    /// Scan the container at `path`, returning how many entries were emitted.
    ///
    /// `contents` is the whole file, if the caller already read it. Records
    /// emitted before an error stay emitted. Iteration stops early, without
    /// error, once `state` stops running.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub(crate) async fn scan(
        &self,
        path: &Path,
        contents: Option<Vec<u8>>,
        perceptual: bool,
        state: &RunState,
        sink: &Arc<dyn ResultSink>,
    ) -> Result<usize> {
        let sniffer = Arc::clone(&self.sniffer);
        let owned: PathBuf = path.to_path_buf();
        let media = blocking(move || sniffer.sniff(&owned)).await?.or_raise(|| ErrorKind::Sniff)?;
        if !media.is_supported_container() {
            tracing::debug!(path = %path.display(), media = %media, "Not a supported container, skipping entries");
            return Ok(0);
        }

        let scanner = self.clone();
        let path = path.to_path_buf();
        let state = state.clone();
        let sink = Arc::clone(sink);
        blocking(move || -> Result<usize> {
            let reader = scanner.opener.open(&path, media, contents).or_raise(|| ErrorKind::Archive)?;
            let mut reader = OpenReader(reader);
            let mut emitted = 0;
            while state.is_running() {
                let Some(entry) = reader.0.next_entry().or_raise(|| ErrorKind::Archive)? else {
                    return Ok(emitted);
                };
                let hashes = scanner
                    .hasher
                    .compute(&path, &entry.name, &entry.data, perceptual)
                    .or_raise(|| ErrorKind::Hash)?;
                sink.push(ResultRecord::Hashed(HashedItem {
                    base_path: path.clone(),
                    internal_name: hashes.internal_name,
                    content_hash: hashes.content_hash,
                    phash: hashes.phash,
                    dhash: hashes.dhash,
                }));
                emitted += 1;
            }
            tracing::info!(path = %path.display(), emitted, "Run halted, abandoning container");
            Ok(emitted)
        })
        .await?
    }
}
