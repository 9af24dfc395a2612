use hashscan_hasher::has_image_extension;
use hashscan_store::ExtantItem;
use std::path::Path;

/// Extensions routed to the archive decision, compared case-insensitively.
pub const ARCHIVE_EXTENSIONS: [&str; 6] = ["zip", "rar", "cbz", "cbr", "7z", "cb7"];

pub fn has_archive_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ARCHIVE_EXTENSIONS.iter().any(|candidate| ext.eq_ignore_ascii_case(candidate)))
}

/// Which decision a task's path goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Container file; the catalog's whole-container record decides.
    Archive,
    /// Every cataloged item for the path already has a hash.
    AlreadyCataloged,
    /// Image lacking a complete record; perceptual hashes decide.
    Image,
    /// Plain file without a whole-file hash.
    BareFile,
    /// Partially hashed, non-image, non-archive path with a whole-file hash
    /// present. Nothing sensible to do.
    Anomalous,
}

impl Route {
    /// Pick the route for `path`, given every item cataloged under it.
    ///
    /// Archive paths never look at `items`, so callers need not fetch them.
    pub fn decide(path: &Path, items: &[ExtantItem]) -> Self {
        if has_archive_extension(path) {
            return Route::Archive;
        }
        if !items.is_empty() && items.iter().all(ExtantItem::has_hash) {
            return Route::AlreadyCataloged;
        }
        if has_image_extension(path) {
            return Route::Image;
        }
        if !items.iter().any(|item| item.has_hash() && item.is_whole_file()) {
            return Route::BareFile;
        }
        Route::Anomalous
    }
}

/// The whole-container records found for an archive path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ContainerRecord {
    Missing,
    /// Exactly one record, with its stored hash (empty if none was stored).
    One(String),
    /// An integrity fault: the catalog allows at most one.
    Many(usize),
}

impl From<Vec<ExtantItem>> for ContainerRecord {
    fn from(mut items: Vec<ExtantItem>) -> Self {
        match items.len() {
            0 => ContainerRecord::Missing,
            1 => ContainerRecord::One(items.remove(0).content_hash),
            n => ContainerRecord::Many(n),
        }
    }
}
