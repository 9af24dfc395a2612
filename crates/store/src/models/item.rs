use crate::error::{Error, ErrorKind};
use crate::item::{CatalogEntry, HashedItem};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use time::UtcDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct ItemRow {
    pub(crate) base_path: Vec<u8>,
    pub(crate) internal_path: String,
    pub(crate) item_hash: Option<String>,
    pub(crate) p_hash: Option<String>,
    pub(crate) d_hash: Option<String>,
    pub(crate) scanned_at: i64,
}

/// Stored form of a base path: the platform's raw path bytes, so names that
/// aren't valid UTF-8 still round-trip.
#[cfg(unix)]
pub(crate) fn path_to_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    use std::os::unix::ffi::OsStrExt;
    Ok(path.as_os_str().as_bytes().to_vec())
}

#[cfg(not(unix))]
pub(crate) fn path_to_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    use exn::OptionExt;
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.as_bytes().to_vec())
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, Error> {
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, Error> {
    Ok(PathBuf::from(String::from_utf8(bytes).or_raise(|| ErrorKind::InvalidData("path"))?))
}

/// Older catalogs stored "no hash" as an empty string rather than NULL.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl ItemRow {
    pub(crate) fn from_hashed(item: &HashedItem, scanned_at: UtcDateTime) -> Result<Self, Error> {
        Ok(Self {
            base_path: path_to_bytes(&item.base_path)?,
            internal_path: item.internal_name.clone(),
            item_hash: Some(item.content_hash.clone()),
            p_hash: item.phash.clone(),
            d_hash: item.dhash.clone(),
            scanned_at: scanned_at.unix_timestamp(),
        })
    }
}
impl TryFrom<ItemRow> for CatalogEntry {
    type Error = Error;
    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            base_path: path_from_bytes(row.base_path)?,
            internal_name: row.internal_path,
            content_hash: non_empty(row.item_hash),
            phash: non_empty(row.p_hash),
            dhash: non_empty(row.d_hash),
            scanned_at: UtcDateTime::from_unix_timestamp(row.scanned_at)
                .or_raise(|| ErrorKind::InvalidData("scan date"))?,
        })
    }
}
