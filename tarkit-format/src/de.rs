use std::io::{ErrorKind, Read};

use crate::error::{Result, TarError};
use crate::header::{self, Block, BLOCK_SIZE};
use crate::record::{EntryHeader, EntryKind};

/// Reads one block. Returns `None` on a clean end of stream at the block
/// boundary; a partial block is corrupt.
pub(crate) fn read_block<R: Read>(reader: &mut R, offset: u64) -> Result<Option<Block>> {
    let mut block = header::empty_block();
    let mut filled = 0;

    while filled < BLOCK_SIZE {
        match reader.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    match filled {
        0 => Ok(None),
        BLOCK_SIZE => Ok(Some(block)),
        _ => Err(TarError::CorruptArchive {
            offset,
            reason: "truncated header block",
        }),
    }
}

#[inline(always)]
fn corrupt(offset: u64, reason: &'static str) -> TarError {
    TarError::CorruptArchive { offset, reason }
}

fn decode_str(field: &[u8], offset: u64) -> Result<String> {
    String::from_utf8(header::field_str(field).to_vec())
        .map_err(|_| corrupt(offset, "header string field is not valid UTF-8"))
}

impl EntryHeader {
    /// Decodes a header block read at `offset`. Returns `None` for an all-zero
    /// block, which marks the end of the archive.
    pub(crate) fn decode(block: &Block, offset: u64) -> Result<Option<EntryHeader>> {
        if header::is_zero_block(block) {
            tracing::debug!(offset = format_args!("{:#x}", offset), "end-of-archive marker");
            return Ok(None);
        }

        let stored = header::parse_octal(&block[header::CHECKSUM])
            .ok_or_else(|| corrupt(offset, "malformed checksum field"))?;
        if stored != u64::from(header::checksum(block)) {
            return Err(corrupt(offset, "header checksum mismatch"));
        }

        let size = header::parse_octal(&block[header::SIZE])
            .ok_or_else(|| corrupt(offset, "malformed size field"))?;

        let kind = EntryKind::from_type_flag(block[header::TYPE_FLAG]);
        let mode = header::parse_octal(&block[header::MODE])
            .map(|m| m as u32)
            .unwrap_or_else(|| kind.default_mode());
        let mtime = header::parse_octal(&block[header::MTIME]).unwrap_or(0);

        let mut name = decode_str(&block[header::NAME], offset)?;
        if &block[header::MAGIC][..5] == b"ustar" {
            let prefix = decode_str(&block[header::PREFIX], offset)?;
            if !prefix.is_empty() {
                name = format!("{}/{}", prefix.trim_end_matches('/'), name);
            }
        }
        let name = name.trim_end_matches('/').to_string();
        let link_name = decode_str(&block[header::LINK_NAME], offset)?;

        tracing::debug!(
            offset = format_args!("{:#x}", offset),
            %name,
            %kind,
            size,
            "deserialized EntryHeader"
        );

        Ok(Some(EntryHeader {
            name,
            kind,
            size,
            mode,
            mtime,
            link_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_what_was_encoded() {
        let entry = EntryHeader::file("docs/readme.md", 1234).with_mtime(1_600_000_000);
        let block = entry.encode().unwrap();
        let decoded = EntryHeader::decode(&block, 0).unwrap().unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn zero_block_is_end() {
        assert!(EntryHeader::decode(&header::empty_block(), 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn checksum_mismatch() {
        let mut block = EntryHeader::directory("dir").encode().unwrap();
        block[1] ^= 0x01;
        match EntryHeader::decode(&block, 0x400) {
            Err(TarError::CorruptArchive { offset, reason }) => {
                assert_eq!(offset, 0x400);
                assert_eq!(reason, "header checksum mismatch");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn ustar_prefix_and_trailing_slash() {
        let mut block = EntryHeader::directory("leaf/").encode().unwrap();
        block[header::PREFIX][..4].copy_from_slice(b"some");
        let sum = u64::from(header::checksum(&block));
        header::write_octal(&mut block[148..155], sum);

        let decoded = EntryHeader::decode(&block, 0).unwrap().unwrap();
        assert_eq!(decoded.name, "some/leaf");
        assert!(decoded.is_dir());
    }

    #[test]
    fn partial_block_is_corrupt() {
        let mut reader = Cursor::new(vec![1u8; 100]);
        assert!(matches!(
            read_block(&mut reader, 0),
            Err(TarError::CorruptArchive { .. })
        ));

        let mut reader = Cursor::new(Vec::<u8>::new());
        assert!(read_block(&mut reader, 0).unwrap().is_none());
    }
}
