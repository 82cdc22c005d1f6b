//! Errors raised while reading or writing coordinate tables.

use std::{fmt, io, path::PathBuf};

/// Errors that may occur when loading or persisting a table.
#[derive(Debug)]
pub enum TableError {
    /// The table file could not be read or written.
    Io { path: PathBuf, source: io::Error },
    /// The persisted table failed to parse.
    ///
    /// Callers usually recover by falling back to the bundled baseline.
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The table could not be serialized.
    Encode(serde_json::Error),
}

impl TableError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the persisted table exists but is unreadable as a
    /// table.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error on '{}': {source}", path.display()),
            Self::Corrupt { path, source } => {
                write!(f, "coordinate table '{}' is corrupt: {source}", path.display())
            }
            Self::Encode(e) => write!(f, "failed to encode coordinate table: {e}"),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Corrupt { source, .. } => Some(source),
            Self::Encode(e) => Some(e),
        }
    }
}
