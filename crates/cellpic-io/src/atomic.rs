//! Atomic file replacement for saved workbooks.
//!
//! The bytes go to a temp file in the destination directory (so the final
//! rename never crosses devices), are flushed and synced, then renamed over
//! the destination. A failure at any step leaves the destination untouched.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` returns `Some("")` for bare file names like `out.xlsx`.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

pub(crate) fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = parent_dir_or_dot(dest);
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.as_file_mut().write_all(bytes)?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    // `persist` replaces an existing destination on all platforms.
    tmp.persist(dest).map_err(|err| err.error)?;
    Ok(())
}
