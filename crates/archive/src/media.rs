use crate::MediaType;
use std::fmt::{Display, Formatter, Result as FmtResult};

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const ZIP_EMPTY_MAGIC: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
const ZIP_SPANNED_MAGIC: [u8; 4] = [0x50, 0x4B, 0x07, 0x08];
// Shared prefix of the RAR 1.5 (`..\x00`) and RAR 5 (`..\x01\x00`) signatures.
const RAR_MAGIC: [u8; 6] = [0x52, 0x61, 0x72, 0x21, 0x1A, 0x07];
const SEVEN_ZIP_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Number of leading bytes needed to recognise every supported format.
pub(crate) const MAGIC_LEN: usize = 8;

impl From<&[u8]> for MediaType {
    fn from(value: &[u8]) -> Self {
        MediaType::from_magic_bytes(value)
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.mime())
    }
}

impl AsRef<str> for MediaType {
    fn as_ref(&self) -> &'static str {
        self.mime()
    }
}

impl MediaType {
    /// Detect the media type from the first bytes of a file.
    ///
    /// Returns [`Unknown`](Self::Unknown) if no magic bytes match or if the
    /// input is too short to detect any format.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&ZIP_MAGIC) || bytes.starts_with(&ZIP_EMPTY_MAGIC) || bytes.starts_with(&ZIP_SPANNED_MAGIC)
        {
            return MediaType::Zip;
        }
        if bytes.starts_with(&RAR_MAGIC) {
            return MediaType::Rar;
        }
        if bytes.starts_with(&SEVEN_ZIP_MAGIC) {
            return MediaType::SevenZip;
        }
        MediaType::Unknown
    }

    /// The MIME string for this media type.
    #[inline]
    #[must_use]
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Unknown => "application/octet-stream",
            MediaType::Zip => "application/zip",
            MediaType::Rar => "application/x-rar",
            MediaType::SevenZip => "application/x-7z-compressed",
        }
    }

    /// Whether the scanner opens containers of this type.
    ///
    /// 7z is recognised but never opened.
    #[inline]
    #[must_use]
    pub fn is_supported_container(&self) -> bool {
        matches!(self, MediaType::Zip | MediaType::Rar)
    }
}
