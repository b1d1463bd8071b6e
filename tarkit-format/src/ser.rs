use std::io::Write;

use crate::error::{Result, TarError};
use crate::header::{self, Block, BLOCK_SIZE};
use crate::path::check_name;
use crate::record::EntryHeader;

impl EntryHeader {
    /// Encodes this header into a USTAR block. Nothing is written if any
    /// field does not fit.
    pub(crate) fn encode(&self) -> Result<Block> {
        check_name(&self.name)?;
        check_name(&self.link_name)?;

        let mut block = header::empty_block();

        block[header::NAME][..self.name.len()].copy_from_slice(self.name.as_bytes());
        block[header::LINK_NAME][..self.link_name.len()]
            .copy_from_slice(self.link_name.as_bytes());

        write_octal_field(&mut block[header::MODE], u64::from(self.mode & 0o7777));
        write_octal_field(&mut block[header::UID], 0);
        write_octal_field(&mut block[header::GID], 0);

        if !header::write_octal(&mut block[header::SIZE], self.size) {
            return Err(TarError::SizeTooLarge {
                name: self.name.clone(),
                size: self.size,
            });
        }

        if !header::write_octal(&mut block[header::MTIME], self.mtime) {
            write_octal_field(&mut block[header::MTIME], 0);
        }

        block[header::TYPE_FLAG] = self.kind.type_flag();
        block[header::MAGIC].copy_from_slice(header::USTAR_MAGIC);
        block[header::VERSION].copy_from_slice(header::USTAR_VERSION);

        // Six octal digits, NUL, space.
        let sum = u64::from(header::checksum(&block));
        write_octal_field(&mut block[header::CHECKSUM.start..header::CHECKSUM.end - 1], sum);
        block[header::CHECKSUM.end - 1] = b' ';

        Ok(block)
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let block = self.encode()?;
        writer.write_all(&block)?;
        tracing::debug!(
            name = %self.name,
            kind = %self.kind,
            size = self.size,
            "serialized EntryHeader"
        );
        Ok(())
    }
}

#[inline(always)]
fn write_octal_field(field: &mut [u8], value: u64) {
    // Callers only pass values that fit their field.
    let _ = header::write_octal(field, value);
}

/// Zero-fills from `data_len` up to the next block boundary, returning the
/// number of padding bytes written.
pub(crate) fn write_padding<W: Write>(writer: &mut W, data_len: u64) -> std::io::Result<u64> {
    let padding = header::padding_for(data_len);
    if padding > 0 {
        writer.write_all(&header::empty_block()[..padding as usize])?;
    }
    Ok(padding)
}

/// Two all-zero blocks.
pub(crate) fn write_end_marker<W: Write>(writer: &mut W) -> std::io::Result<u64> {
    let block = header::empty_block();
    writer.write_all(&block)?;
    writer.write_all(&block)?;
    Ok(2 * BLOCK_SIZE as u64)
}
