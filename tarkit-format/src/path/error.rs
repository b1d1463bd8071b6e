use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntoEntryPathError {
    UnrepresentableStr,
    Absolute,
    EscapesRoot,
    EmptyPath,
}

impl std::error::Error for IntoEntryPathError {}

impl fmt::Display for IntoEntryPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl IntoEntryPathError {
    pub fn as_str(&self) -> &str {
        match self {
            IntoEntryPathError::UnrepresentableStr => "unrepresentable string found in path",
            IntoEntryPathError::Absolute => "absolute path received as input",
            IntoEntryPathError::EscapesRoot => "path escapes the archive root",
            IntoEntryPathError::EmptyPath => "no path provided",
        }
    }
}
