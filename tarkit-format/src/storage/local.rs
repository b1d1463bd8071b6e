use std::fs::{File, OpenOptions};
use std::io::{Error, ErrorKind, Result};
use std::path::{Path, PathBuf};

use super::{DirEntry, FileInfo, FileKind, OpenMode, Storage};

/// Storage backed by the native filesystem.
///
/// Without a root, storage paths are used as native paths verbatim. With a
/// root, every storage path (absolute or not) resolves beneath it.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    root: Option<PathBuf>,
}

impl LocalStorage {
    pub fn new() -> LocalStorage {
        LocalStorage { root: None }
    }

    pub fn rooted<P: AsRef<Path>>(root: P) -> LocalStorage {
        LocalStorage {
            root: Some(root.as_ref().to_path_buf()),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            None => PathBuf::from(path),
            Some(root) => root.join(path.trim_start_matches('/')),
        }
    }
}

#[inline(always)]
fn file_info(meta: &std::fs::Metadata) -> FileInfo {
    if meta.is_dir() {
        FileInfo {
            kind: FileKind::Directory,
            size: 0,
        }
    } else if meta.is_file() {
        FileInfo {
            kind: FileKind::File,
            size: meta.len(),
        }
    } else {
        FileInfo {
            kind: FileKind::Other,
            size: 0,
        }
    }
}

pub struct LocalReadDir {
    inner: std::fs::ReadDir,
}

impl Iterator for LocalReadDir {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(v) => v,
            Err(e) => return Some(Err(e)),
        };

        let name = match entry.file_name().into_string() {
            Ok(v) => v,
            Err(raw) => {
                return Some(Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("non UTF-8 file name: {:?}", raw),
                )))
            }
        };

        // Does not follow symlinks; a link is reported as `FileKind::Other`.
        Some(entry.metadata().map(|meta| DirEntry {
            name,
            info: file_info(&meta),
        }))
    }
}

impl Storage for LocalStorage {
    type File = File;
    type ReadDir = LocalReadDir;

    fn open(&self, path: &str, mode: OpenMode) -> Result<File> {
        let path = self.resolve(path);
        match mode {
            OpenMode::ReadExisting => OpenOptions::new().read(true).open(path),
            OpenMode::CreateAlways => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path),
        }
    }

    fn read_dir(&self, path: &str) -> Result<LocalReadDir> {
        std::fs::read_dir(self.resolve(path)).map(|inner| LocalReadDir { inner })
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        std::fs::metadata(self.resolve(path)).map(|meta| file_info(&meta))
    }

    fn mkdir_all(&self, path: &str) -> Result<()> {
        std::fs::create_dir_all(self.resolve(path))
    }

    fn canonicalize(&self, path: &str) -> Result<String> {
        let canonical = std::fs::canonicalize(self.resolve(path))?;
        canonical.into_os_string().into_string().map_err(|raw| {
            Error::new(
                ErrorKind::InvalidData,
                format!("non UTF-8 path: {:?}", raw),
            )
        })
    }
}
