use crate::error::{ErrorKind, Result};
use crate::reader::{ArchiveEntry, ArchiveReader};
use ::zip::ZipArchive;
use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

// Entry sizes come from the (untrusted) central directory; never pre-allocate
// more than this up front.
const MAX_PREALLOCATE: usize = 16 * 1024 * 1024;

/// Reads the file entries of a zip container, in central-directory order.
pub struct ZipReader<R: Read + Seek> {
    path: PathBuf,
    archive: Option<ZipArchive<R>>,
    next: usize,
}

impl ZipReader<Cursor<Vec<u8>>> {
    /// Open a zip container already read into memory.
    pub fn from_bytes(path: impl AsRef<Path>, bytes: Vec<u8>) -> Result<Self> {
        Self::new(path, Cursor::new(bytes))
    }
}

impl ZipReader<BufReader<File>> {
    /// Open a zip container from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).or_raise(|| ErrorKind::Io)?;
        Self::new(path, BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipReader<R> {
    fn new(path: impl AsRef<Path>, reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader).or_raise(|| ErrorKind::InvalidData)?;
        Ok(Self { path: path.as_ref().to_path_buf(), archive: Some(archive), next: 0 })
    }

    /// Number of entries (including directories) in the central directory.
    pub fn len(&self) -> usize {
        self.archive.as_ref().map(ZipArchive::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Read + Seek> ArchiveReader for ZipReader<R> {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        let Some(archive) = self.archive.as_mut() else {
            return Ok(None);
        };
        while self.next < archive.len() {
            let index = self.next;
            self.next += 1;
            let mut file = archive.by_index(index).or_raise(|| ErrorKind::InvalidData)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let capacity = usize::try_from(file.size()).unwrap_or(0).min(MAX_PREALLOCATE);
            let mut data = Vec::with_capacity(capacity);
            file.read_to_end(&mut data).or_raise(|| ErrorKind::InvalidData)?;
            return Ok(Some(ArchiveEntry { name, data }));
        }
        Ok(None)
    }

    fn close(&mut self) {
        if self.archive.take().is_some() {
            tracing::trace!(path = %self.path.display(), "Closed zip container");
        }
    }
}
