mod item;

pub(crate) use self::item::{ItemRow, path_to_bytes};
