use std::path::PathBuf;

use tarkit_format::{LocalStorage, Storage};

use crate::error::{Error, Result};
use crate::util::{format_size, path_str};

pub fn run(archive: PathBuf, source_dir: PathBuf, verbose: bool) -> Result<()> {
    let storage = LocalStorage::new();
    let archive_path = path_str(&archive)?;
    let source_path = path_str(&source_dir)?;

    tracing::debug!(archive = archive_path, source = source_path, "create");

    tarkit_format::pack(&storage, source_path, archive_path).map_err(|source| {
        Error::CreateArchive {
            path: archive.clone(),
            source,
        }
    })?;

    if verbose {
        let size = storage.stat(archive_path).map(|info| info.size).unwrap_or(0);
        println!("{}: {}", archive.display(), format_size(size));
    }

    Ok(())
}
