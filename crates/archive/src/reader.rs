use crate::MediaType;
use crate::error::{ErrorKind, Result};
use crate::formats::ZipReader;
use std::path::Path;

/// One file inside a container, fully read into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path of the entry inside the container.
    pub name: String,
    pub data: Vec<u8>,
}

/// Iterates the file entries of an open container.
///
/// Directory entries are never returned. After [`close`](Self::close) the
/// reader holds no handle and [`next_entry`](Self::next_entry) returns
/// `Ok(None)`. Closing twice is harmless.
pub trait ArchiveReader {
    /// Read the next entry, or `Ok(None)` once the container is exhausted.
    ///
    /// An error means the current entry (or the container's index) is
    /// corrupt; callers should stop iterating.
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>>;

    /// Release the underlying file handle or buffer.
    fn close(&mut self);
}

/// Opens containers for entry iteration.
pub trait ArchiveOpener: Send + Sync {
    /// Open `path` as a container of type `media`.
    ///
    /// When `contents` holds the whole file already read into memory, the
    /// implementation may use it instead of reading `path` again.
    fn open(&self, path: &Path, media: MediaType, contents: Option<Vec<u8>>) -> Result<Box<dyn ArchiveReader>>;
}

/// Opens zip containers (and rar, with the `rar` feature).
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultOpener;

impl ArchiveOpener for DefaultOpener {
    fn open(&self, path: &Path, media: MediaType, contents: Option<Vec<u8>>) -> Result<Box<dyn ArchiveReader>> {
        match media {
            MediaType::Zip => match contents {
                Some(bytes) => Ok(Box::new(ZipReader::from_bytes(path, bytes)?)),
                None => Ok(Box::new(ZipReader::from_path(path)?)),
            },
            #[cfg(feature = "rar")]
            MediaType::Rar => {
                // unrar only reads from disk; the in-memory copy is of no use.
                drop(contents);
                Ok(Box::new(crate::formats::RarReader::open(path)?))
            },
            #[cfg(not(feature = "rar"))]
            MediaType::Rar => exn::bail!(ErrorKind::DisabledFormat("rar".to_string())),
            MediaType::SevenZip | MediaType::Unknown => {
                exn::bail!(ErrorKind::UnsupportedFormat(media.mime().to_string()))
            },
        }
    }
}
