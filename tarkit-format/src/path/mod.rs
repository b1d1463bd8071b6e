use relative_path::{Component, RelativePath};
use std::fmt;

mod error;

pub use self::error::IntoEntryPathError;

use crate::error::{Result, TarError};
use crate::header::NAME_LEN;

/// The separator used both in entry names and in storage paths.
pub const PATH_SEP: &str = "/";

/// A sanitized, relative, `/`-delimited entry path that cannot escape the
/// directory it is resolved against. It never contains `.` or `..` chunks.
#[derive(Debug, Clone, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EntryPath(String);

impl EntryPath {
    pub fn new<S: AsRef<str>>(name: S) -> std::result::Result<EntryPath, IntoEntryPathError> {
        let name = name.as_ref();

        if name.starts_with(PATH_SEP) {
            return Err(IntoEntryPathError::Absolute);
        }

        if name.chars().any(|c| c == '\\' || c == '\0') {
            return Err(IntoEntryPathError::UnrepresentableStr);
        }

        let mut out: Vec<&str> = vec![];
        let normalized = RelativePath::new(name).normalize();
        for component in normalized.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => return Err(IntoEntryPathError::EscapesRoot),
                Component::Normal(chunk) => out.push(chunk),
            }
        }

        if out.is_empty() {
            return Err(IntoEntryPathError::EmptyPath);
        }

        Ok(EntryPath(out.join(PATH_SEP)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parent(&self) -> Option<EntryPath> {
        self.0
            .rfind(PATH_SEP)
            .map(|idx| EntryPath(self.0[..idx].to_string()))
    }

    pub fn depth(&self) -> usize {
        self.0.matches(PATH_SEP).count()
    }

    /// Resolves this path under a storage directory.
    pub fn resolve(&self, root: &str) -> String {
        join(root, &self.0)
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joins a storage path and a child name with a single separator.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with(PATH_SEP) {
        format!("{}{}", base, name)
    } else {
        format!("{}{}{}", base, PATH_SEP, name)
    }
}

/// The in-archive name of `name` under `prefix`; an empty prefix is the
/// archive root.
pub fn entry_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, PATH_SEP, name)
    }
}

/// Fails with `NameTooLong` if `name` does not fit the header name field.
pub fn check_name(name: &str) -> Result<()> {
    if name.len() > NAME_LEN {
        return Err(TarError::NameTooLong {
            name: name.to_string(),
            len: name.len(),
            max: NAME_LEN,
        });
    }
    Ok(())
}
