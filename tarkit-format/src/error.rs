use crate::path::IntoEntryPathError;

pub type Result<T> = std::result::Result<T, TarError>;

#[derive(Debug, thiserror::Error)]
pub enum TarError {
    #[error("Opening stream failed. Path: '{1}'")]
    OpenFailed(#[source] std::io::Error, String),

    #[error("Archive stream I/O failed.")]
    Io(#[from] std::io::Error),

    #[error("Reading file failed. Path: '{1}'")]
    ReadFailed(#[source] std::io::Error, String),

    #[error("Writing file failed. Path: '{1}'")]
    WriteFailed(#[source] std::io::Error, String),

    #[error("Entry data does not match its declared size. Entry: '{name}', declared: {declared}, supplied: {supplied}")]
    SizeMismatch {
        name: String,
        declared: u64,
        supplied: u64,
    },

    #[error("Archive is corrupt at offset {offset:#x}: {reason}")]
    CorruptArchive { offset: u64, reason: &'static str },

    #[error("Entry name is {len} bytes, the header allows at most {max}. Name: '{name}'")]
    NameTooLong { name: String, len: usize, max: usize },

    #[error("Entry size {size} does not fit in the header size field. Entry: '{name}'")]
    SizeTooLarge { name: String, size: u64 },

    #[error("Entry path cannot be restored safely. Entry: '{1}'")]
    UnsafePath(#[source] IntoEntryPathError, String),

    #[error("Creating directory failed. Path: '{1}'")]
    DirCreateFailed(#[source] std::io::Error, String),

    #[error("Reading directory failed. Path: '{1}'")]
    ReadDirFailed(#[source] std::io::Error, String),

    #[error("Invalid entry sequence: {0}")]
    EntryState(&'static str),
}

impl TarError {
    /// True for failures that come from a short or failed read/write on an
    /// already open stream.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            TarError::Io(_)
                | TarError::ReadFailed(..)
                | TarError::WriteFailed(..)
                | TarError::SizeMismatch { .. }
        )
    }
}
