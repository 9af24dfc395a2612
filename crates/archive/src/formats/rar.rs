use crate::error::{ErrorKind, Result};
use crate::reader::{ArchiveEntry, ArchiveReader};
use ::unrar::{Archive, CursorBeforeHeader, OpenArchive, Process};
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// Reads the file entries of a rar container through the bundled unrar library.
pub struct RarReader {
    path: PathBuf,
    archive: Option<OpenArchive<Process, CursorBeforeHeader>>,
}

impl RarReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let archive = Archive::new(&path).open_for_processing().or_raise(|| ErrorKind::InvalidData)?;
        Ok(Self { path, archive: Some(archive) })
    }
}

impl ArchiveReader for RarReader {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        loop {
            let Some(archive) = self.archive.take() else {
                return Ok(None);
            };
            let Some(header) = archive.read_header().or_raise(|| ErrorKind::InvalidData)? else {
                return Ok(None);
            };
            if header.entry().is_directory() {
                self.archive = Some(header.skip().or_raise(|| ErrorKind::InvalidData)?);
                continue;
            }
            let name = header.entry().filename.to_string_lossy().into_owned();
            let (data, rest) = header.read().or_raise(|| ErrorKind::InvalidData)?;
            self.archive = Some(rest);
            return Ok(Some(ArchiveEntry { name, data }));
        }
    }

    fn close(&mut self) {
        if self.archive.take().is_some() {
            tracing::trace!(path = %self.path.display(), "Closed rar container");
        }
    }
}
