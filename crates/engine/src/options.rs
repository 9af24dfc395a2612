use hashscan_archive::{ArchiveOpener, DefaultOpener, MagicSniffer, TypeSniffer};
use hashscan_hasher::{HashComputer, ImageHasher};
use hashscan_store::StoreHandle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-run settings shared by every worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    /// Compute pHash/dHash for bare files and container entries. Images
    /// routed through the image decision always get them.
    pub compute_perceptual_hash: bool,
    /// Re-hash containers that are already cataloged and compare.
    pub verify_archive_integrity: bool,
    /// Paths under any of these roots are refused outright.
    pub disallowed_roots: Vec<PathBuf>,
    /// How long a worker waits for a task before checking for shutdown.
    pub poll_interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            compute_perceptual_hash: true,
            verify_archive_integrity: true,
            disallowed_roots: vec![PathBuf::from("/content")],
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ScanOptions {
    pub fn is_disallowed(&self, path: &Path) -> bool {
        self.disallowed_roots.iter().any(|root| path.starts_with(root))
    }
}

/// Everything a worker consults besides the task queue and result sink.
#[derive(Clone)]
pub struct Collaborators {
    pub store: StoreHandle,
    pub hasher: Arc<dyn HashComputer>,
    pub sniffer: Arc<dyn TypeSniffer>,
    pub opener: Arc<dyn ArchiveOpener>,
}

impl Collaborators {
    /// The default hasher, sniffer and opener around `store`.
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            hasher: Arc::new(ImageHasher),
            sniffer: Arc::new(MagicSniffer),
            opener: Arc::new(DefaultOpener),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn HashComputer>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_sniffer(mut self, sniffer: Arc<dyn TypeSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn ArchiveOpener>) -> Self {
        self.opener = opener;
        self
    }
}
