use crate::MediaType;
use crate::error::{ErrorKind, Result};
use crate::media::MAGIC_LEN;
use exn::ResultExt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Determines the media type of a file on disk.
pub trait TypeSniffer: Send + Sync {
    /// Fails if the file cannot be read; an unrecognised file is
    /// [`MediaType::Unknown`], not an error.
    fn sniff(&self, path: &Path) -> Result<MediaType>;
}

/// Sniffs the media type from the file's leading magic bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct MagicSniffer;

impl TypeSniffer for MagicSniffer {
    fn sniff(&self, path: &Path) -> Result<MediaType> {
        let file = File::open(path).or_raise(|| ErrorKind::Io)?;
        let mut head = Vec::with_capacity(MAGIC_LEN);
        file.take(MAGIC_LEN as u64).read_to_end(&mut head).or_raise(|| ErrorKind::Io)?;
        Ok(MediaType::from_magic_bytes(&head))
    }
}
