use std::io::{BufWriter, Write};
use std::time::SystemTime;

use crate::error::{Result, TarError};
use crate::header::BLOCK_SIZE;
use crate::record::{EntryHeader, EntryKind};
use crate::ser::{write_end_marker, write_padding};
use crate::storage::{OpenMode, Storage};

#[derive(Debug)]
struct PendingEntry {
    name: String,
    declared: u64,
    written: u64,
}

/// A write-mode archive session over one exclusively owned stream.
///
/// Entries are written as header, data (repeatable), end of data. At most one
/// entry is in progress at a time.
#[derive(Debug)]
pub struct TarFileWriter<W: Write> {
    pub(crate) stream: W,
    pending: Option<PendingEntry>,
    offset: u64,
    finalized: bool,
    /// Set once a stream write fails; the stream position is then unknown.
    failed: bool,
}

#[inline(always)]
fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl<F: Write> TarFileWriter<BufWriter<F>> {
    /// Creates (or truncates) the archive at `path` for writing.
    pub fn create<S: Storage<File = F>>(storage: &S, path: &str) -> Result<Self> {
        let file = storage
            .open(path, OpenMode::CreateAlways)
            .map_err(|e| TarError::OpenFailed(e, path.to_string()))?;
        tracing::debug!(%path, "opened archive for writing");
        Ok(TarFileWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write> TarFileWriter<W> {
    pub fn new(stream: W) -> TarFileWriter<W> {
        TarFileWriter {
            stream,
            pending: None,
            offset: 0,
            finalized: false,
            failed: false,
        }
    }

    /// Bytes written to the stream so far.
    #[inline(always)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline(always)]
    pub fn is_entry_open(&self) -> bool {
        self.pending.is_some()
    }

    #[inline(always)]
    fn ensure_writable(&self) -> Result<()> {
        if self.failed {
            return Err(TarError::EntryState("archive stream failed"));
        }
        if self.finalized {
            return Err(TarError::EntryState("archive is already finalized"));
        }
        if self.pending.is_some() {
            return Err(TarError::EntryState("previous entry was not finished"));
        }
        Ok(())
    }

    /// Writes one header block. Anything other than a zero-size directory
    /// opens an entry that must be completed with [`end_data`](Self::end_data).
    pub fn write_header(&mut self, header: &EntryHeader) -> Result<()> {
        self.ensure_writable()?;
        match header.write(&mut self.stream) {
            Ok(()) => {}
            Err(TarError::Io(e)) => return self.check_stream(Err(e)),
            Err(e) => return Err(e),
        }
        self.offset += BLOCK_SIZE as u64;

        if header.kind != EntryKind::Directory || header.size > 0 {
            self.pending = Some(PendingEntry {
                name: header.name.clone(),
                declared: header.size,
                written: 0,
            });
        }
        Ok(())
    }

    pub fn write_file_header(&mut self, name: &str, size: u64) -> Result<()> {
        self.write_header(&EntryHeader::file(name, size).with_mtime(now()))
    }

    /// Writes a zero-size directory entry.
    pub fn write_dir(&mut self, name: &str) -> Result<()> {
        self.write_header(&EntryHeader::directory(name).with_mtime(now()))
    }

    /// Writes raw data for the open entry. Does not pad.
    pub fn write_data(&mut self, data: &[u8]) -> Result<usize> {
        let supplied = {
            let pending = self
                .pending
                .as_ref()
                .ok_or(TarError::EntryState("no entry in progress"))?;

            let supplied = pending.written + data.len() as u64;
            if supplied > pending.declared {
                return Err(TarError::SizeMismatch {
                    name: pending.name.clone(),
                    declared: pending.declared,
                    supplied,
                });
            }
            supplied
        };

        let result = self.stream.write_all(data);
        self.check_stream(result)?;

        if let Some(pending) = self.pending.as_mut() {
            pending.written = supplied;
        }
        self.offset += data.len() as u64;
        Ok(data.len())
    }

    /// Completes the open entry, padding its data to the block boundary.
    pub fn end_data(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or(TarError::EntryState("no entry in progress"))?;

        if pending.written != pending.declared {
            return Err(TarError::SizeMismatch {
                name: pending.name,
                declared: pending.declared,
                supplied: pending.written,
            });
        }

        let result = write_padding(&mut self.stream, pending.written);
        let padding = self.check_stream(result)?;
        self.offset += padding;
        tracing::debug!(
            name = %pending.name,
            bytes = pending.written,
            padding,
            "finished entry"
        );
        Ok(())
    }

    /// Header, data and padding for a payload that is already in memory.
    pub fn store_data(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.write_file_header(name, data.len() as u64)?;
        self.write_data(data)?;
        self.end_data()
    }

    /// Writes the end-of-archive marker. Must be called exactly once, after the
    /// last entry is finished.
    pub fn finalize(&mut self) -> Result<()> {
        self.ensure_writable()?;
        let result = write_end_marker(&mut self.stream);
        self.offset += self.check_stream(result)?;
        let result = self.stream.flush();
        self.check_stream(result)?;
        self.finalized = true;
        tracing::debug!(bytes = self.offset, "finalized archive");
        Ok(())
    }

    #[inline(always)]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Abandons the open entry and refuses further writes if `result` is a
    /// stream failure.
    fn check_stream<T>(&mut self, result: std::io::Result<T>) -> Result<T> {
        result.map_err(|e| {
            if let Some(pending) = self.pending.take() {
                tracing::warn!(name = %pending.name, error = %e, "entry abandoned after stream failure");
            }
            self.failed = true;
            TarError::Io(e)
        })
    }

    /// Flushes and returns the underlying stream.
    pub fn into_inner(mut self) -> Result<W> {
        if let Some(pending) = &self.pending {
            tracing::warn!(name = %pending.name, "closing archive with an unfinished entry");
        } else if !self.finalized {
            tracing::warn!("closing archive without an end-of-archive marker");
        }
        self.stream.flush()?;
        Ok(self.stream)
    }

    /// Flushes and releases the stream.
    pub fn close(self) -> Result<()> {
        self.into_inner().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::NAME_LEN;
    use crate::storage::MemoryStorage;

    fn writer() -> TarFileWriter<Vec<u8>> {
        TarFileWriter::new(Vec::new())
    }

    #[test]
    fn block_alignment() {
        for (size, total) in [(0usize, 512usize), (1, 1024), (511, 1024), (512, 1024), (513, 1536)]
            .iter()
            .copied()
        {
            let mut w = writer();
            w.store_data("f", &vec![0xAA; size]).unwrap();
            assert_eq!(w.offset(), total as u64, "size {}", size);
            assert_eq!(w.into_inner().unwrap().len(), total);
        }
    }

    #[test]
    fn chunked_entry() {
        let mut w = writer();
        w.write_file_header("chunks", 700).unwrap();
        assert_eq!(w.write_data(&[1; 512]).unwrap(), 512);
        assert_eq!(w.write_data(&[2; 188]).unwrap(), 188);
        w.end_data().unwrap();
        w.finalize().unwrap();

        let out = w.into_inner().unwrap();
        assert_eq!(out.len(), 512 + 1024 + 1024);
        assert_eq!(out[512], 1);
        assert_eq!(out[512 + 699], 2);
        assert!(out[512 + 700..].iter().all(|b| *b == 0));
    }

    #[test]
    fn oversupplied_data() {
        let mut w = writer();
        w.write_file_header("f", 3).unwrap();
        match w.write_data(b"four") {
            Err(TarError::SizeMismatch {
                declared, supplied, ..
            }) => {
                assert_eq!(declared, 3);
                assert_eq!(supplied, 4);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn undersupplied_data() {
        let mut w = writer();
        w.write_file_header("f", 3).unwrap();
        w.write_data(b"ab").unwrap();
        assert!(matches!(w.end_data(), Err(TarError::SizeMismatch { .. })));
    }

    #[test]
    fn one_entry_at_a_time() {
        let mut w = writer();
        w.write_file_header("a", 1).unwrap();
        assert!(matches!(w.write_dir("b"), Err(TarError::EntryState(_))));
        assert!(matches!(w.finalize(), Err(TarError::EntryState(_))));
    }

    #[test]
    fn data_without_entry() {
        let mut w = writer();
        w.write_dir("d").unwrap();
        assert!(!w.is_entry_open());
        assert!(matches!(w.write_data(b"x"), Err(TarError::EntryState(_))));
        assert!(matches!(w.end_data(), Err(TarError::EntryState(_))));
    }

    #[test]
    fn finalize_once() {
        let mut w = writer();
        w.finalize().unwrap();
        assert!(w.is_finalized());
        assert!(matches!(w.finalize(), Err(TarError::EntryState(_))));
        assert_eq!(w.into_inner().unwrap(), vec![0u8; 1024]);
    }

    #[test]
    fn rejected_name_leaves_stream_untouched() {
        let mut w = writer();
        let name = "n".repeat(NAME_LEN + 1);
        assert!(matches!(
            w.write_file_header(&name, 0),
            Err(TarError::NameTooLong { .. })
        ));
        assert!(!w.is_entry_open());
        assert_eq!(w.offset(), 0);

        w.write_file_header(&"n".repeat(NAME_LEN), 0).unwrap();
        w.end_data().unwrap();
        assert_eq!(w.into_inner().unwrap().len(), 512);
    }

    #[test]
    fn create_on_storage() {
        let storage = MemoryStorage::new();
        let mut w = TarFileWriter::create(&storage, "/out.tar").unwrap();
        w.store_data("hello.txt", b"hello").unwrap();
        w.finalize().unwrap();
        w.close().unwrap();

        assert_eq!(storage.read_file("/out.tar").unwrap().len(), 512 * 4);
    }

    #[test]
    fn failing_stream_abandons_entry() {
        struct ShortWriter {
            budget: usize,
        }

        impl Write for ShortWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if self.budget == 0 {
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, "medium full"));
                }
                let n = buf.len().min(self.budget);
                self.budget -= n;
                Ok(n)
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut w = TarFileWriter::new(ShortWriter {
            budget: BLOCK_SIZE + 100,
        });
        w.write_file_header("f", 1000).unwrap();

        let err = w.write_data(&[7u8; 600]).unwrap_err();
        assert!(matches!(err, TarError::Io(_)));
        assert!(!w.is_entry_open());
        assert_eq!(w.offset(), BLOCK_SIZE as u64);

        assert!(matches!(w.end_data(), Err(TarError::EntryState("no entry in progress"))));
        assert!(matches!(w.write_dir("d"), Err(TarError::EntryState("archive stream failed"))));
        assert!(matches!(w.finalize(), Err(TarError::EntryState("archive stream failed"))));
    }

    #[test]
    fn create_without_parent() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            TarFileWriter::create(&storage, "/missing/out.tar"),
            Err(TarError::OpenFailed(..))
        ));
    }
}
