//! Media type sniffing and archive entry readers.
//!
//! This crate provides the two collaborators the scan engine uses when it
//! meets a container file:
//!
//! - **Type sniffing** from magic bytes ([`MediaType::from_magic_bytes`],
//!   [`TypeSniffer`]), so a container is only opened when its content
//!   actually looks like a supported format, whatever its extension says.
//! - **Entry iteration** through [`ArchiveReader`], opened by an
//!   [`ArchiveOpener`]. Readers hand out one fully-read entry at a time and
//!   must be closed by the caller on every exit path.
//!
//! Zip is always available. Rar needs the `rar` feature (which builds the
//! bundled unrar library). 7z is recognised but cannot be opened.

pub mod error;
mod formats;
mod media;
mod reader;
mod sniff;

pub use crate::formats::ZipReader;
#[cfg(feature = "rar")]
pub use crate::formats::RarReader;
pub use crate::reader::{ArchiveEntry, ArchiveOpener, ArchiveReader, DefaultOpener};
pub use crate::sniff::{MagicSniffer, TypeSniffer};

/// A media type recognised by its magic bytes.
///
/// Only [`Zip`](Self::Zip) and [`Rar`](Self::Rar) are containers the scanner
/// will open; see [`MediaType::is_supported_container`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// Anything without recognised magic bytes (including empty files).
    #[default]
    Unknown,
    /// Zip archive (also `.cbz`)
    Zip,
    /// Rar archive, v1.5 or v5 (also `.cbr`)
    Rar,
    /// 7-Zip archive (also `.cb7`)
    SevenZip,
}
