//! The storage capabilities archive packing and unpacking are built on.
//!
//! Paths are `/`-separated strings in the backend's own namespace. Every
//! operation blocks until it completes or fails.

use std::io::{Read, Seek, Write};

mod local;
mod memory;

pub use self::local::LocalStorage;
pub use self::memory::MemoryStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading.
    ReadExisting,
    /// Create the file for writing, truncating it if it already exists.
    CreateAlways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    /// Symlinks, devices, sockets and anything else that is neither. Not
    /// followed and not packed.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub kind: FileKind,
    pub size: u64,
}

impl FileInfo {
    #[inline(always)]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub info: FileInfo,
}

pub trait Storage {
    type File: Read + Write + Seek;

    /// Yields the children of a directory one at a time. Running out of items
    /// is the end-of-directory signal; an `Err` item means the directory
    /// could not be read further.
    type ReadDir: Iterator<Item = std::io::Result<DirEntry>>;

    fn open(&self, path: &str, mode: OpenMode) -> std::io::Result<Self::File>;

    fn read_dir(&self, path: &str) -> std::io::Result<Self::ReadDir>;

    fn stat(&self, path: &str) -> std::io::Result<FileInfo>;

    fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    /// Creates `path` and any missing parents. Succeeds if it already exists
    /// as a directory.
    fn mkdir_all(&self, path: &str) -> std::io::Result<()>;

    /// A single spelling for `path`, so two paths naming the same file compare
    /// equal. The default resolves `.` and `..` lexically and roots the result.
    fn canonicalize(&self, path: &str) -> std::io::Result<String> {
        Ok(lexical_canonical(path))
    }
}

pub(crate) fn lexical_canonical(path: &str) -> String {
    let mut out: Vec<&str> = vec![];
    for chunk in path.split('/') {
        match chunk {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            chunk => out.push(chunk),
        }
    }
    format!("/{}", out.join("/"))
}
