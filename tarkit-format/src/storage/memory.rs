use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Error, ErrorKind, Read, Result, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{DirEntry, FileInfo, FileKind, OpenMode, Storage};

type Data = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Clone)]
enum Node {
    File(Data),
    Directory,
}

#[derive(Debug, Default)]
struct Tree {
    /// Keyed by normalized path; the root directory ("") is implicit.
    nodes: BTreeMap<String, Node>,
    failing_opens: HashMap<String, u32>,
    open_attempts: HashMap<String, u32>,
    broken_dirs: HashSet<String>,
}

/// An in-memory storage tree.
///
/// Cloning shares the tree. Faults can be injected per path to simulate a
/// busy or flaky medium.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tree: Arc<Mutex<Tree>>,
}

#[inline(always)]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|chunk| !chunk.is_empty() && *chunk != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

impl Tree {
    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || matches!(self.nodes.get(path), Some(Node::Directory))
    }

    fn mkdir_all(&mut self, path: &str) -> Result<()> {
        let mut current = String::new();
        for chunk in path.split('/').filter(|c| !c.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(chunk);

            match self.nodes.get(&current) {
                Some(Node::Directory) => {}
                Some(Node::File(_)) => {
                    return Err(Error::new(
                        ErrorKind::AlreadyExists,
                        format!("not a directory: {}", current),
                    ))
                }
                None => {
                    self.nodes.insert(current.clone(), Node::Directory);
                }
            }
        }
        Ok(())
    }
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    #[inline(always)]
    fn tree(&self) -> MutexGuard<'_, Tree> {
        lock(&self.tree)
    }

    /// Stores a file, creating missing parent directories.
    pub fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let path = normalize(path);
        let mut tree = self.tree();
        tree.mkdir_all(parent_of(&path))?;
        if tree.is_dir(&path) {
            return Err(Error::new(ErrorKind::AlreadyExists, "is a directory"));
        }
        tree.nodes
            .insert(path, Node::File(Arc::new(Mutex::new(data.to_vec()))));
        Ok(())
    }

    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        match self.tree().nodes.get(&normalize(path)) {
            Some(Node::File(data)) => Some(lock(data).clone()),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.tree().is_dir(&normalize(path))
    }

    /// All paths under `root` (relative to it), directories suffixed with `/`.
    pub fn list_tree(&self, root: &str) -> Vec<String> {
        let root = normalize(root);
        let tree = self.tree();
        tree.nodes
            .iter()
            .filter_map(|(path, node)| {
                let rel = if root.is_empty() {
                    path.as_str()
                } else {
                    path.strip_prefix(&root)?.strip_prefix('/')?
                };
                Some(match node {
                    Node::Directory => format!("{}/", rel),
                    Node::File(_) => rel.to_string(),
                })
            })
            .collect()
    }

    /// Makes the next `count` opens of `path` fail as if the medium were busy.
    pub fn fail_opens(&self, path: &str, count: u32) {
        self.tree().failing_opens.insert(normalize(path), count);
    }

    pub fn open_attempts(&self, path: &str) -> u32 {
        self.tree()
            .open_attempts
            .get(&normalize(path))
            .copied()
            .unwrap_or(0)
    }

    /// Makes listing `path` fail after it has been opened.
    pub fn break_dir(&self, path: &str) {
        self.tree().broken_dirs.insert(normalize(path));
    }
}

impl Storage for MemoryStorage {
    type File = MemoryFile;
    type ReadDir = std::vec::IntoIter<Result<DirEntry>>;

    fn open(&self, path: &str, mode: OpenMode) -> Result<MemoryFile> {
        let path = normalize(path);
        let mut tree = self.tree();

        *tree.open_attempts.entry(path.clone()).or_insert(0) += 1;

        if let Some(remaining) = tree.failing_opens.get_mut(&path) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::new(ErrorKind::Other, "storage medium busy"));
            }
        }

        match mode {
            OpenMode::ReadExisting => match tree.nodes.get(&path) {
                Some(Node::File(data)) => Ok(MemoryFile::new(data.clone(), false)),
                Some(Node::Directory) => Err(Error::new(ErrorKind::Other, "is a directory")),
                None => Err(Error::new(ErrorKind::NotFound, "no such file")),
            },
            OpenMode::CreateAlways => {
                if path.is_empty() || tree.is_dir(&path) {
                    return Err(Error::new(ErrorKind::Other, "is a directory"));
                }
                if !tree.is_dir(parent_of(&path)) {
                    return Err(Error::new(ErrorKind::NotFound, "parent directory missing"));
                }
                let data = Arc::new(Mutex::new(Vec::new()));
                tree.nodes.insert(path, Node::File(data.clone()));
                Ok(MemoryFile::new(data, true))
            }
        }
    }

    fn read_dir(&self, path: &str) -> Result<Self::ReadDir> {
        let path = normalize(path);
        let tree = self.tree();

        if !tree.is_dir(&path) {
            return Err(Error::new(ErrorKind::NotFound, "no such directory"));
        }

        if tree.broken_dirs.contains(&path) {
            let err = Error::new(ErrorKind::Other, "directory read failed");
            return Ok(vec![Err(err)].into_iter());
        }

        let entries = tree
            .nodes
            .iter()
            .filter(|(child, _)| !child.is_empty() && parent_of(child) == path)
            .map(|(child, node)| {
                let name = child.rsplit('/').next().unwrap_or(child).to_string();
                let info = match node {
                    Node::Directory => FileInfo {
                        kind: FileKind::Directory,
                        size: 0,
                    },
                    Node::File(data) => FileInfo {
                        kind: FileKind::File,
                        size: lock(data).len() as u64,
                    },
                };
                Ok(DirEntry { name, info })
            })
            .collect::<Vec<_>>();

        Ok(entries.into_iter())
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        let path = normalize(path);
        let tree = self.tree();
        if tree.is_dir(&path) {
            return Ok(FileInfo {
                kind: FileKind::Directory,
                size: 0,
            });
        }
        match tree.nodes.get(&path) {
            Some(Node::File(data)) => Ok(FileInfo {
                kind: FileKind::File,
                size: lock(data).len() as u64,
            }),
            _ => Err(Error::new(ErrorKind::NotFound, "no such file")),
        }
    }

    fn mkdir_all(&self, path: &str) -> Result<()> {
        self.tree().mkdir_all(&normalize(path))
    }
}

/// A handle to a file in a [`MemoryStorage`].
#[derive(Debug)]
pub struct MemoryFile {
    data: Data,
    pos: u64,
    writable: bool,
}

impl MemoryFile {
    fn new(data: Data, writable: bool) -> MemoryFile {
        MemoryFile {
            data,
            pos: 0,
            writable,
        }
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let data = lock(&self.data);
        let start = (self.pos as usize).min(data.len());
        let len = buf.len().min(data.len() - start);
        buf[..len].copy_from_slice(&data[start..start + len]);
        self.pos += len as u64;
        Ok(len)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.writable {
            return Err(Error::new(ErrorKind::PermissionDenied, "file opened read-only"));
        }
        let mut data = lock(&self.data);
        let start = self.pos as usize;
        let end = start + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = lock(&self.data).len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if target < 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_and_dirs() {
        let storage = MemoryStorage::new();
        storage.write_file("/int/a/b.txt", b"hello").unwrap();

        assert!(storage.is_dir("/int"));
        assert!(storage.is_dir("/int/a"));
        assert_eq!(storage.read_file("/int/a/b.txt").unwrap(), b"hello");
        assert_eq!(storage.stat("/int/a/b.txt").unwrap().size, 5);
        assert_eq!(storage.list_tree("/int"), vec!["a/", "a/b.txt"]);

        let entries = storage
            .read_dir("/int")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
        assert!(entries[0].info.is_dir());
    }

    #[test]
    fn create_needs_parent() {
        let storage = MemoryStorage::new();
        let err = storage
            .open("/nowhere/file", OpenMode::CreateAlways)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        storage.mkdir_all("/nowhere").unwrap();
        assert!(storage.open("/nowhere/file", OpenMode::CreateAlways).is_ok());
    }

    #[test]
    fn handle_io() {
        let storage = MemoryStorage::new();
        let mut file = storage.open("/f", OpenMode::CreateAlways).unwrap();
        file.write_all(b"abcdef").unwrap();
        file.seek(SeekFrom::Start(2)).unwrap();
        let mut buf = [0u8; 3];
        file.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cde");

        let mut file = storage.open("/f", OpenMode::ReadExisting).unwrap();
        assert!(file.write(b"x").is_err());
    }

    #[test]
    fn injected_open_failures() {
        let storage = MemoryStorage::new();
        storage.write_file("/f", b"").unwrap();
        storage.fail_opens("/f", 2);

        assert!(storage.open("/f", OpenMode::ReadExisting).is_err());
        assert!(storage.open("/f", OpenMode::ReadExisting).is_err());
        assert!(storage.open("/f", OpenMode::ReadExisting).is_ok());
        assert_eq!(storage.open_attempts("/f"), 3);
    }

    #[test]
    fn broken_directory() {
        let storage = MemoryStorage::new();
        storage.mkdir_all("/d").unwrap();
        storage.break_dir("/d");

        let mut iter = storage.read_dir("/d").unwrap();
        assert!(iter.next().unwrap().is_err());
    }
}
