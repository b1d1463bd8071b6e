use std::path::PathBuf;
use std::time::Duration;

use tarkit_format::{ExtractOptions, LocalStorage, RetryPolicy, Storage};

use crate::error::{Error, Result};
use crate::util::{format_size, path_str};

pub fn run(
    archive: PathBuf,
    output: PathBuf,
    retries: u32,
    retry_delay: u64,
    verbose: bool,
) -> Result<()> {
    let storage = LocalStorage::new();
    let dest = path_str(&output)?;
    tracing::debug!(archive = %archive.display(), dest, retries, retry_delay, "extract");

    storage
        .mkdir_all(dest)
        .map_err(|source| Error::CreateDirectory {
            path: output.clone(),
            source,
        })?;

    let options = ExtractOptions {
        retry: RetryPolicy::new(retries, Duration::from_millis(retry_delay)),
    };

    let stats = tarkit_format::unpack(&storage, path_str(&archive)?, dest, &options).map_err(
        |source| Error::ExtractArchive {
            path: archive.clone(),
            source,
        },
    )?;

    if verbose {
        println!(
            "{} files, {} directories, {} written",
            stats.files,
            stats.directories,
            format_size(stats.bytes)
        );
    }
    if stats.skipped > 0 {
        eprintln!("Skipped {} entries of unsupported kinds.", stats.skipped);
    }

    Ok(())
}
