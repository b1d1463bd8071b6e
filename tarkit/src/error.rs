use std::path::PathBuf;

use miette::Diagnostic;
use tarkit_format::TarError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Cannot handle path `{}`: not valid UTF-8", .path.display())]
    InvalidPath { path: PathBuf },

    #[error("Cannot open archive `{}`", .path.display())]
    #[diagnostic(help("Does the file exist and is it readable?"))]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: TarError,
    },

    #[error("Cannot read archive `{}`", .path.display())]
    #[diagnostic(help("Is this a valid tar archive?"))]
    ReadArchive {
        path: PathBuf,
        #[source]
        source: TarError,
    },

    #[error("Cannot create archive `{}`", .path.display())]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: TarError,
    },

    #[error("Cannot extract archive `{}`", .path.display())]
    #[diagnostic(help("Is this a valid tar archive?"))]
    ExtractArchive {
        path: PathBuf,
        #[source]
        source: TarError,
    },

    #[error("Cannot create directory `{}`", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_archive_report() {
        let err = Error::ReadArchive {
            path: "broken.tar".into(),
            source: TarError::CorruptArchive {
                offset: 1024,
                reason: "header checksum mismatch",
            },
        };
        assert_eq!(
            err.help().map(|h| h.to_string()).as_deref(),
            Some("Is this a valid tar archive?")
        );

        let report = miette::Report::new(err);
        let chain = report.chain().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0], "Cannot read archive `broken.tar`");
        assert!(chain[1].contains("offset 0x400"));
    }
}
