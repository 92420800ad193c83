//! Local file lifecycle for one target.
//!
//! Files are written in place under the destination directory (no temp name,
//! no rename): the on-disk length *is* the resume offset and the progress
//! measure, so a partially written file must keep its final name.

mod writer;

pub use writer::{TargetWriter, WriteMode};

use std::io;
use std::path::Path;

/// Current on-disk length of `path`, 0 when it does not exist.
pub fn local_len(path: &Path) -> io::Result<u64> {
    match std::fs::metadata(path) {
        Ok(m) => Ok(m.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

/// Creates the parent directories of `path` if needed.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
