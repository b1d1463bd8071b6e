use std::path::PathBuf;

use tarkit_format::{LocalStorage, TarFileReader};

use crate::error::{Error, Result};
use crate::util::{format_kind, format_path, format_size, path_str};

pub fn run(archive: PathBuf, verbose: bool) -> Result<()> {
    let storage = LocalStorage::new();
    tracing::debug!(archive = %archive.display(), "list");

    let mut reader =
        TarFileReader::open(&storage, path_str(&archive)?).map_err(|source| Error::OpenArchive {
            path: archive.clone(),
            source,
        })?;

    let headers = reader.entries().map_err(|source| Error::ReadArchive {
        path: archive.clone(),
        source,
    })?;
    reader.close();

    println!("{:<12}  {:>12}  {:>6}  Path", "Kind", "Size", "Mode");
    println!("{}", "-".repeat(48));

    let mut total = 0u64;
    for header in headers.iter() {
        let size = if header.is_dir() {
            "-".to_string()
        } else {
            format_size(header.size)
        };
        println!(
            "{:<12}  {:>12}  {:>6o}  {}",
            format_kind(header.kind),
            size,
            header.mode,
            format_path(header)
        );
        if verbose && !header.link_name.is_empty() {
            println!("{:<12}  {:>12}  {:>6}  -> {}", "", "", "", header.link_name);
        }
        total += header.size;
    }

    println!("{}", "-".repeat(48));
    println!("{} entries, {}", headers.len(), format_size(total));

    Ok(())
}
