use std::path::PathBuf;
use time::UtcDateTime;

/// Read-only view of an already-cataloged item, as the scan engine sees it.
///
/// A missing hash is represented by an empty string, so "has a hash" is
/// always `!content_hash.is_empty()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtantItem {
    pub base_path: PathBuf,
    /// Empty for the whole-file (or whole-container) record.
    pub internal_name: String,
    pub content_hash: String,
}
impl ExtantItem {
    pub fn new(base_path: impl Into<PathBuf>, internal_name: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            internal_name: internal_name.into(),
            content_hash: content_hash.into(),
        }
    }

    #[inline]
    pub fn has_hash(&self) -> bool {
        !self.content_hash.is_empty()
    }

    #[inline]
    pub fn is_whole_file(&self) -> bool {
        self.internal_name.is_empty()
    }
}

/// Hashes stored for a single `(base_path, internal_name)` key.
///
/// Every field is `None` when the key is not cataloged at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredHashes {
    pub content_hash: Option<String>,
    pub phash: Option<String>,
    pub dhash: Option<String>,
}
impl StoredHashes {
    /// Both perceptual hashes are present.
    pub fn has_perceptual(&self) -> bool {
        self.phash.is_some() && self.dhash.is_some()
    }
}

/// A freshly computed set of hashes for one item, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashedItem {
    pub base_path: PathBuf,
    pub internal_name: String,
    pub content_hash: String,
    pub phash: Option<String>,
    pub dhash: Option<String>,
}

/// A full catalog row, used for reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub base_path: PathBuf,
    pub internal_name: String,
    pub content_hash: Option<String>,
    pub phash: Option<String>,
    pub dhash: Option<String>,
    pub scanned_at: UtcDateTime,
}
impl From<CatalogEntry> for ExtantItem {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            base_path: entry.base_path,
            internal_name: entry.internal_name,
            content_hash: entry.content_hash.unwrap_or_default(),
        }
    }
}
impl From<&CatalogEntry> for StoredHashes {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            content_hash: entry.content_hash.clone(),
            phash: entry.phash.clone(),
            dhash: entry.dhash.clone(),
        }
    }
}

/// Every catalog row sharing one content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub content_hash: String,
    pub items: Vec<CatalogEntry>,
}
