//! Raw USTAR header block layout.
//!
//! A header is one 512-byte block. Numeric fields are NUL-terminated octal
//! ASCII. The checksum is the unsigned byte sum of the whole block with the
//! checksum field itself counted as eight spaces.

use std::ops::Range;

pub const BLOCK_SIZE: usize = 512;

/// Width of the `name` field. A name of exactly this length is stored without
/// a terminating NUL.
pub const NAME_LEN: usize = 100;

pub(crate) const NAME: Range<usize> = 0..100;
pub(crate) const MODE: Range<usize> = 100..108;
pub(crate) const UID: Range<usize> = 108..116;
pub(crate) const GID: Range<usize> = 116..124;
pub(crate) const SIZE: Range<usize> = 124..136;
pub(crate) const MTIME: Range<usize> = 136..148;
pub(crate) const CHECKSUM: Range<usize> = 148..156;
pub(crate) const TYPE_FLAG: usize = 156;
pub(crate) const LINK_NAME: Range<usize> = 157..257;
pub(crate) const MAGIC: Range<usize> = 257..263;
pub(crate) const VERSION: Range<usize> = 263..265;
pub(crate) const PREFIX: Range<usize> = 345..500;

pub(crate) const USTAR_MAGIC: &[u8; 6] = b"ustar\0";
pub(crate) const USTAR_VERSION: &[u8; 2] = b"00";

/// Largest value an 11-digit octal size field can hold.
pub const MAX_ENTRY_SIZE: u64 = 0o777_7777_7777;

pub(crate) type Block = [u8; BLOCK_SIZE];

#[inline(always)]
pub(crate) fn empty_block() -> Block {
    [0u8; BLOCK_SIZE]
}

/// Number of zero bytes needed after `len` data bytes to reach a block boundary.
#[inline(always)]
pub fn padding_for(len: u64) -> u64 {
    let rem = len % BLOCK_SIZE as u64;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE as u64 - rem
    }
}

pub(crate) fn checksum(block: &Block) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if CHECKSUM.contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(*b)
            }
        })
        .sum()
}

pub(crate) fn is_zero_block(block: &Block) -> bool {
    block.iter().all(|b| *b == 0)
}

/// Writes `value` as zero-padded octal filling all but the last byte of
/// `field`, followed by a NUL. Returns `false` if the value does not fit.
pub(crate) fn write_octal(field: &mut [u8], value: u64) -> bool {
    let digits = field.len() - 1;
    let s = format!("{:0width$o}", value, width = digits);
    if s.len() > digits {
        return false;
    }
    field[..digits].copy_from_slice(s.as_bytes());
    field[digits] = 0;
    true
}

/// Parses an octal field, tolerating leading spaces and trailing NUL/space
/// terminators. Returns `None` on any other byte.
pub(crate) fn parse_octal(field: &[u8]) -> Option<u64> {
    let trimmed = field
        .iter()
        .skip_while(|b| **b == b' ')
        .take_while(|b| **b != 0 && **b != b' ');

    let mut value: u64 = 0;
    let mut seen = false;
    for b in trimmed {
        if !(b'0'..=b'7').contains(b) {
            return None;
        }
        value = value.checked_mul(8)?.checked_add(u64::from(b - b'0'))?;
        seen = true;
    }

    if seen {
        Some(value)
    } else if field.iter().all(|b| *b == 0 || *b == b' ') {
        Some(0)
    } else {
        None
    }
}

/// Returns the bytes of a NUL-terminated (or full-width) string field.
pub(crate) fn field_str(field: &[u8]) -> &[u8] {
    match field.iter().position(|b| *b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}
