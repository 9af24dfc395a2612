#[cfg(feature = "rar")]
mod rar;
mod zip;

#[cfg(feature = "rar")]
pub use self::rar::RarReader;
pub use self::zip::ZipReader;
