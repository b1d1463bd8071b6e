use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};

use crate::de::read_block;
use crate::error::{Result, TarError};
use crate::header::{padding_for, BLOCK_SIZE};
use crate::record::EntryHeader;
use crate::storage::{OpenMode, Storage};

/// A read-mode archive session over one exclusively owned stream.
#[derive(Debug)]
pub struct TarFileReader<R: Read + Seek> {
    pub(crate) stream: R,
}

/// Cursor over the data of the entry currently being visited.
#[derive(Debug)]
pub struct EntryData<'a, R> {
    stream: &'a mut R,
    remaining: u64,
}

impl<'a, R: Read> EntryData<'a, R> {
    /// Bytes of entry data not yet read.
    #[inline(always)]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.remaining == 0
    }

    /// Fills `buf` up to its length or the end of the entry data, whichever
    /// comes first. Returns 0 only at end of data.
    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        let want = (buf.len() as u64).min(self.remaining) as usize;
        let mut filled = 0;

        while filled < want {
            match self.stream.read(&mut buf[filled..want]) {
                Ok(0) => {
                    return Err(TarError::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "archive ended inside entry data",
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.remaining -= filled as u64;
        Ok(filled)
    }
}

impl<'a, R: Read> Read for EntryData<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let want = (buf.len() as u64).min(self.remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let n = self.stream.read(&mut buf[..want])?;
        if n == 0 {
            return Err(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "archive ended inside entry data",
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl<F: Read + Seek> TarFileReader<BufReader<F>> {
    /// Opens an existing archive at `path` for reading.
    pub fn open<S: Storage<File = F>>(storage: &S, path: &str) -> Result<Self> {
        let file = storage
            .open(path, OpenMode::ReadExisting)
            .map_err(|e| TarError::OpenFailed(e, path.to_string()))?;
        tracing::debug!(%path, "opened archive for reading");
        Ok(TarFileReader::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> TarFileReader<R> {
    pub fn new(stream: R) -> TarFileReader<R> {
        TarFileReader { stream }
    }

    /// Walks every entry from the start of the archive, calling `visitor` with
    /// each header and a cursor over its data. Unread data is skipped. The
    /// first visitor error stops the walk and is returned.
    pub fn foreach_entry<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&EntryHeader, &mut EntryData<'_, R>) -> Result<()>,
    {
        let mut offset = self.stream.seek(SeekFrom::Start(0))?;

        loop {
            let block = read_block(&mut self.stream, offset)?.ok_or(TarError::CorruptArchive {
                offset,
                reason: "missing end-of-archive marker",
            })?;

            let header = match EntryHeader::decode(&block, offset)? {
                Some(v) => v,
                None => return Ok(()),
            };

            let data_start = offset + BLOCK_SIZE as u64;
            {
                let mut data = EntryData {
                    stream: &mut self.stream,
                    remaining: header.size,
                };
                visitor(&header, &mut data)?;
            }

            offset = data_start + header.size + padding_for(header.size);
            self.stream.seek(SeekFrom::Start(offset))?;
        }
    }

    /// Headers of every entry, in archive order.
    pub fn entries(&mut self) -> Result<Vec<EntryHeader>> {
        let mut headers = vec![];
        self.foreach_entry(|header, _| {
            headers.push(header.clone());
            Ok(())
        })?;
        Ok(headers)
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    /// Releases the stream.
    pub fn close(self) {
        drop(self.stream);
    }
}
