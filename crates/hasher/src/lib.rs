//! Content and perceptual hashing.
//!
//! Every item gets a BLAKE3 content hash. Images may additionally get two
//! 64-bit perceptual hashes, used to find near-duplicates that differ in
//! encoding, scale or compression:
//!
//! - **pHash**: low-frequency DCT coefficients of a 32×32 grayscale thumbnail
//!   compared against their median.
//! - **dHash**: horizontal brightness gradient of a 9×8 grayscale thumbnail.
//!
//! Both are rendered as 16 lowercase hex characters; compare them with
//! [`hamming_distance`].
//!
//! # Limitations
//!
//! Only BMP, GIF, JPEG, PNG, PNM, TIFF and WebP content can be decoded. The
//! other [`IMAGE_EXTENSIONS`] (`eps`, `im`, `msp`, `pcx`, `spider`, `xbm`)
//! are still routed to perceptual hashing, so a file of one of those formats
//! fails with [`ErrorKind::UndecodableImage`] on every scan and never gets a
//! catalog record, not even a content hash. Content is sniffed rather than
//! trusted from the name, so a PNG saved as `.pcx` hashes fine.

pub mod error;
mod perceptual;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

pub use crate::perceptual::{difference_hash, hamming_distance, perceptual_hash};

/// Extensions of files treated as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 14] = [
    "bmp", "eps", "gif", "im", "jpeg", "jpg", "msp", "pcx", "png", "ppm", "spider", "tiff", "webp", "xbm",
];

/// Whether `path` (a filesystem path or a container entry name) has one of
/// the [`IMAGE_EXTENSIONS`].
pub fn has_image_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|candidate| ext.eq_ignore_ascii_case(candidate)))
}

/// Lowercase hex BLAKE3 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// The hashes computed for one item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hashes {
    /// Entry name inside a container, or empty for a whole file.
    pub internal_name: String,
    pub content_hash: String,
    pub phash: Option<String>,
    pub dhash: Option<String>,
}

/// Computes the hashes of one item from its bytes.
pub trait HashComputer: Send + Sync {
    /// Hash `bytes`, the content of `path` (or of entry `internal_name` inside
    /// the container at `path`).
    ///
    /// Perceptual hashes are only attempted when `perceptual` is set and the
    /// item is named like an image. If that decode fails the whole
    /// computation fails.
    fn compute(&self, path: &Path, internal_name: &str, bytes: &[u8], perceptual: bool) -> Result<Hashes>;
}

/// BLAKE3 content hashing plus pHash/dHash for decodable images.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageHasher;

impl HashComputer for ImageHasher {
    #[instrument(level = "trace", skip(self, bytes), fields(path = %path.display(), size = bytes.len()))]
    fn compute(&self, path: &Path, internal_name: &str, bytes: &[u8], perceptual: bool) -> Result<Hashes> {
        let named = if internal_name.is_empty() { path } else { Path::new(internal_name) };
        let mut hashes = Hashes {
            internal_name: internal_name.to_string(),
            content_hash: content_hash(bytes),
            ..Default::default()
        };
        if perceptual && has_image_extension(named) {
            let decoded = image::load_from_memory(bytes)
                .or_raise(|| ErrorKind::UndecodableImage(named.display().to_string()))?;
            hashes.phash = Some(format!("{:016x}", perceptual_hash(&decoded)));
            hashes.dhash = Some(format!("{:016x}", difference_hash(&decoded)));
        }
        Ok(hashes)
    }
}
