use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TarError};
use crate::file::TarFileWriter;
use crate::header::BLOCK_SIZE;
use crate::path::{check_name, entry_name, join};
use crate::storage::{FileKind, OpenMode, Storage};

/// Source files are streamed in chunks of one data block.
pub const FILE_BLOCK_SIZE: usize = BLOCK_SIZE;

struct Frame<I> {
    entries: I,
    fs_path: String,
    prefix: String,
}

/// The archive being written, in the storage's canonical spelling.
struct Exclude {
    canonical: String,
    file_name: String,
}

impl Exclude {
    fn new<S: Storage>(storage: &S, archive_path: &str) -> Option<Exclude> {
        let canonical = match storage.canonicalize(archive_path) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(path = archive_path, error = %e, "cannot canonicalize archive path");
                return None;
            }
        };
        let file_name = canonical
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or("")
            .to_string();
        Some(Exclude {
            canonical,
            file_name,
        })
    }

    /// Only entries with the archive's file name are canonicalized.
    fn matches<S: Storage>(&self, storage: &S, name: &str, path: &str) -> bool {
        name == self.file_name
            && storage
                .canonicalize(path)
                .map(|p| p == self.canonical)
                .unwrap_or(false)
    }
}

/// Packs the contents of `source_root` into a new archive at `archive_path`.
/// Entries are named relative to `source_root`. If the archive lies inside the
/// source tree it is left out.
///
/// On failure the partially written archive is left in place.
pub fn pack<S: Storage>(storage: &S, source_root: &str, archive_path: &str) -> Result<()> {
    tracing::info!(source = source_root, archive = archive_path, "packing tree");

    let mut writer = TarFileWriter::create(storage, archive_path)?;
    let exclude = Exclude::new(storage, archive_path);
    writer.walk_dir(storage, source_root, "", exclude.as_ref())?;
    writer.finalize()?;

    let bytes = writer.offset();
    writer.close()?;

    tracing::info!(archive = archive_path, bytes, "packed tree");
    Ok(())
}

impl<W: Write> TarFileWriter<W> {
    /// Appends everything below `fs_path`, naming entries under `prefix`.
    /// Directories are written before their contents. The first failure stops
    /// the walk; entries already written stay in the stream.
    pub fn add_dir<S: Storage>(&mut self, storage: &S, fs_path: &str, prefix: &str) -> Result<()> {
        self.walk_dir(storage, fs_path, prefix, None)
    }

    fn walk_dir<S: Storage>(
        &mut self,
        storage: &S,
        fs_path: &str,
        prefix: &str,
        exclude: Option<&Exclude>,
    ) -> Result<()> {
        let entries = storage
            .read_dir(fs_path)
            .map_err(|e| TarError::ReadDirFailed(e, fs_path.to_string()))?;

        let mut stack = vec![Frame {
            entries,
            fs_path: fs_path.to_string(),
            prefix: prefix.to_string(),
        }];

        while let Some(frame) = stack.last_mut() {
            let entry = match frame.entries.next() {
                Some(Ok(v)) => v,
                Some(Err(e)) => return Err(TarError::ReadDirFailed(e, frame.fs_path.clone())),
                None => {
                    stack.pop();
                    continue;
                }
            };

            let child_path = join(&frame.fs_path, &entry.name);
            let child_name = entry_name(&frame.prefix, &entry.name);

            match entry.info.kind {
                FileKind::Directory => {
                    self.write_dir(&child_name)?;
                    let entries = storage
                        .read_dir(&child_path)
                        .map_err(|e| TarError::ReadDirFailed(e, child_path.clone()))?;
                    stack.push(Frame {
                        entries,
                        fs_path: child_path,
                        prefix: child_name,
                    });
                }
                FileKind::File => {
                    if let Some(exclude) = exclude {
                        if exclude.matches(storage, &entry.name, &child_path) {
                            tracing::debug!(path = %child_path, "skipping the archive being written");
                            continue;
                        }
                    }
                    self.add_file(storage, &child_path, &child_name, entry.info.size)?;
                }
                FileKind::Other => {
                    tracing::warn!(path = %child_path, "skipping entry that is neither file nor directory");
                }
            }
        }

        Ok(())
    }

    /// Streams one source file into a regular-file entry of `size` bytes.
    /// The source open is not retried.
    pub fn add_file<S: Storage>(
        &mut self,
        storage: &S,
        fs_path: &str,
        archive_name: &str,
        size: u64,
    ) -> Result<()> {
        check_name(archive_name)?;

        let mut file = storage
            .open(fs_path, OpenMode::ReadExisting)
            .map_err(|e| TarError::OpenFailed(e, fs_path.to_string()))?;

        self.write_file_header(archive_name, size)?;

        let mut buf = [0u8; FILE_BLOCK_SIZE];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(FILE_BLOCK_SIZE as u64) as usize;
            let n = match file.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(TarError::ReadFailed(
                        std::io::Error::new(ErrorKind::UnexpectedEof, "file shrank while packing"),
                        fs_path.to_string(),
                    ))
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TarError::ReadFailed(e, fs_path.to_string())),
            };
            self.write_data(&buf[..n])?;
            remaining -= n as u64;
        }

        self.end_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::TarFileReader;
    use crate::header::NAME_LEN;
    use crate::record::EntryKind;
    use crate::storage::MemoryStorage;
    use std::io::Cursor;

    fn names(storage: &MemoryStorage, archive: &str) -> Vec<String> {
        let bytes = storage.read_file(archive).unwrap();
        TarFileReader::new(Cursor::new(bytes))
            .entries()
            .unwrap()
            .into_iter()
            .map(|h| match h.kind {
                EntryKind::Directory => format!("{}/", h.name),
                _ => h.name,
            })
            .collect()
    }

    #[test]
    fn directories_precede_contents() {
        let storage = MemoryStorage::new();
        storage.write_file("/src/a/b/deep.txt", b"deep").unwrap();
        storage.write_file("/src/a/mid.txt", b"mid").unwrap();
        storage.write_file("/src/top.txt", b"top").unwrap();
        storage.mkdir_all("/src/empty").unwrap();
        storage.mkdir_all("/out").unwrap();

        pack(&storage, "/src", "/out/a.tar").unwrap();

        assert_eq!(
            names(&storage, "/out/a.tar"),
            vec!["a/", "a/b/", "a/b/deep.txt", "a/mid.txt", "empty/", "top.txt"]
        );
    }

    #[test]
    fn prefix_is_applied() {
        let storage = MemoryStorage::new();
        storage.write_file("/src/x/y.txt", b"y").unwrap();

        let mut writer = TarFileWriter::new(Vec::new());
        writer.add_dir(&storage, "/src", "base").unwrap();
        writer.finalize().unwrap();

        let headers = TarFileReader::new(Cursor::new(writer.into_inner().unwrap()))
            .entries()
            .unwrap();
        let names = headers.iter().map(|h| h.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["base/x", "base/x/y.txt"]);
    }

    #[test]
    fn empty_source() {
        let storage = MemoryStorage::new();
        storage.mkdir_all("/src").unwrap();

        pack(&storage, "/src", "/a.tar").unwrap();
        assert_eq!(storage.read_file("/a.tar").unwrap(), vec![0u8; 1024]);
    }

    #[test]
    fn chunked_file_contents() {
        let storage = MemoryStorage::new();
        let payload = (0..1500u32).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        storage.write_file("/src/blob", &payload).unwrap();

        pack(&storage, "/src", "/a.tar").unwrap();

        let bytes = storage.read_file("/a.tar").unwrap();
        assert_eq!(bytes.len(), 512 + 1536 + 1024);
        assert_eq!(&bytes[512..512 + 1500], &payload[..]);
    }

    #[test]
    fn archive_inside_source_is_skipped() {
        let storage = MemoryStorage::new();
        storage.write_file("/src/keep.txt", b"keep").unwrap();

        pack(&storage, "/src", "/src/self.tar").unwrap();
        assert_eq!(names(&storage, "/src/self.tar"), vec!["keep.txt"]);
    }

    #[test]
    fn archive_inside_source_spelled_differently() {
        let storage = MemoryStorage::new();
        storage.write_file("/src/keep.txt", b"keep").unwrap();
        storage.write_file("/src/sub/self.tar", b"not the archive").unwrap();

        pack(&storage, "src/", "/src/../src/./self.tar").unwrap();
        assert_eq!(
            names(&storage, "/src/self.tar"),
            vec!["keep.txt", "sub/", "sub/self.tar"]
        );
    }

    #[test]
    fn unreadable_directory() {
        let storage = MemoryStorage::new();
        storage.write_file("/src/bad/file", b"x").unwrap();
        storage.break_dir("/src/bad");

        match pack(&storage, "/src", "/a.tar") {
            Err(TarError::ReadDirFailed(_, path)) => assert_eq!(path, "/src/bad"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_source() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            pack(&storage, "/nope", "/a.tar"),
            Err(TarError::ReadDirFailed(..))
        ));
    }

    #[test]
    fn source_open_is_not_retried() {
        let storage = MemoryStorage::new();
        storage.write_file("/src/busy.txt", b"x").unwrap();
        storage.fail_opens("/src/busy.txt", 1);

        assert!(matches!(
            pack(&storage, "/src", "/a.tar"),
            Err(TarError::OpenFailed(_, ref path)) if path == "/src/busy.txt"
        ));
        assert_eq!(storage.open_attempts("/src/busy.txt"), 1);
    }

    #[test]
    fn long_name_aborts() {
        let storage = MemoryStorage::new();
        let long = "n".repeat(NAME_LEN - 3);
        storage.write_file(&format!("/src/dir/{}", long), b"x").unwrap();

        assert!(matches!(
            pack(&storage, "/src", "/a.tar"),
            Err(TarError::NameTooLong { .. })
        ));
        assert_eq!(storage.open_attempts(&format!("/src/dir/{}", long)), 0);
    }
}
