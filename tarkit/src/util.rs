use std::path::Path;

use tarkit_format::{EntryHeader, EntryKind};

use crate::error::{Error, Result};

/// Storage paths are UTF-8 strings.
pub fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| Error::InvalidPath {
        path: path.to_path_buf(),
    })
}

#[inline(always)]
pub fn format_size(size: u64) -> String {
    use humansize::{file_size_opts as options, FileSize};

    size.file_size(options::BINARY)
        .unwrap_or_else(|_| format!("{} B", size))
}

#[inline(always)]
pub fn format_kind(kind: EntryKind) -> String {
    match kind {
        EntryKind::Directory => "<directory>".to_string(),
        kind => kind.to_string(),
    }
}

/// Directories are shown with a trailing separator.
#[inline(always)]
pub fn format_path(header: &EntryHeader) -> String {
    if header.is_dir() {
        format!("{}/", header.name)
    } else {
        header.name.clone()
    }
}
