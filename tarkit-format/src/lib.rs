//! Tar archive packing and unpacking over pluggable storage.
//!
//! Archives use the USTAR header layout: one 512-byte header block per entry,
//! the entry data zero-padded to a block boundary, and two all-zero blocks at
//! the end.

mod de;
mod error;
mod file;
pub mod header;
mod pack;
pub mod path;
mod record;
mod retry;
mod ser;
pub mod storage;
mod unpack;

pub use error::{Result, TarError};
pub use file::{EntryData, TarFileReader, TarFileWriter};
pub use pack::{pack, FILE_BLOCK_SIZE};
pub use path::EntryPath;
pub use record::{EntryHeader, EntryKind};
pub use retry::RetryPolicy;
pub use storage::{LocalStorage, MemoryStorage, OpenMode, Storage};
pub use unpack::{unpack, ExtractOptions, ExtractStats};
