use std::io::{BufWriter, Read, Seek, Write};

use crate::error::{Result, TarError};
use crate::file::{EntryData, TarFileReader};
use crate::pack::FILE_BLOCK_SIZE;
use crate::path::{EntryPath, IntoEntryPathError};
use crate::record::{EntryHeader, EntryKind};
use crate::retry::RetryPolicy;
use crate::storage::{OpenMode, Storage};

/// Options for extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Applied to destination file opens only.
    pub retry: RetryPolicy,
}

/// Statistics from extracting an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Number of files extracted.
    pub files: u64,
    /// Number of directory entries restored.
    pub directories: u64,
    /// Number of entries of unsupported kinds that were skipped.
    pub skipped: u64,
    /// Total bytes written to extracted files.
    pub bytes: u64,
}

/// Restores the archive at `archive_path` under `dest_root`, in archive order.
///
/// The first failure stops extraction; anything already restored is kept.
pub fn unpack<S: Storage>(
    storage: &S,
    archive_path: &str,
    dest_root: &str,
    options: &ExtractOptions,
) -> Result<ExtractStats> {
    tracing::info!(archive = archive_path, dest = dest_root, "restoring tree");

    let mut reader = TarFileReader::open(storage, archive_path)?;
    let stats = reader.unpack_to(storage, dest_root, options)?;
    reader.close();

    tracing::info!(
        files = stats.files,
        directories = stats.directories,
        skipped = stats.skipped,
        bytes = stats.bytes,
        "restored tree"
    );
    Ok(stats)
}

impl<R: Read + Seek> TarFileReader<R> {
    /// Restores every entry of this archive under `dest_root`.
    pub fn unpack_to<S: Storage>(
        &mut self,
        storage: &S,
        dest_root: &str,
        options: &ExtractOptions,
    ) -> Result<ExtractStats> {
        let mut stats = ExtractStats::default();
        self.foreach_entry(|header, data| {
            extract_entry(storage, dest_root, options, header, data, &mut stats)
        })?;
        Ok(stats)
    }
}

fn dir_path(header: &EntryHeader, dest_root: &str) -> Result<String> {
    match EntryPath::new(&header.name) {
        Ok(path) => Ok(path.resolve(dest_root)),
        // "./" and friends name the destination itself.
        Err(IntoEntryPathError::EmptyPath) => Ok(dest_root.to_string()),
        Err(e) => Err(TarError::UnsafePath(e, header.name.clone())),
    }
}

fn extract_entry<S: Storage, R: Read>(
    storage: &S,
    dest_root: &str,
    options: &ExtractOptions,
    header: &EntryHeader,
    data: &mut EntryData<'_, R>,
    stats: &mut ExtractStats,
) -> Result<()> {
    match header.kind {
        EntryKind::Directory => {
            let path = dir_path(header, dest_root)?;
            storage
                .mkdir_all(&path)
                .map_err(|e| TarError::DirCreateFailed(e, path.clone()))?;
            tracing::debug!(%path, "created directory");
            stats.directories += 1;
        }
        EntryKind::Other(_) => {
            tracing::warn!(name = %header.name, kind = %header.kind, "skipping unsupported entry");
            stats.skipped += 1;
        }
        EntryKind::File => {
            let entry_path = EntryPath::new(&header.name)
                .map_err(|e| TarError::UnsafePath(e, header.name.clone()))?;
            let path = entry_path.resolve(dest_root);

            if let Some(parent) = entry_path.parent() {
                let parent = parent.resolve(dest_root);
                if !storage.exists(&parent) {
                    storage
                        .mkdir_all(&parent)
                        .map_err(|e| TarError::DirCreateFailed(e, parent.clone()))?;
                }
            }

            let file = options
                .retry
                .run(&path, || storage.open(&path, OpenMode::CreateAlways))
                .map_err(|e| TarError::OpenFailed(e, path.clone()))?;
            let mut out = BufWriter::new(file);

            let mut buf = [0u8; FILE_BLOCK_SIZE];
            loop {
                let n = data.read_data(&mut buf)?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n])
                    .map_err(|e| TarError::WriteFailed(e, path.clone()))?;
            }
            out.flush()
                .map_err(|e| TarError::WriteFailed(e, path.clone()))?;

            tracing::info!(%path, bytes = header.size, "extracted file");
            stats.files += 1;
            stats.bytes += header.size;
        }
    }

    Ok(())
}
