//! Error types.

use std::{fmt, io, path::PathBuf};

use coord_table::TableError;
use skrifa::{outline::DrawError, raw::ReadError};

use crate::bitmap::Canvas;

/// Errors that may occur when reading a font.
#[derive(Debug)]
pub enum FontError {
    /// The font file could not be opened.
    Io(io::Error),
    /// The font data is malformed.
    Read(ReadError),
    /// A glyph failed to draw.
    Draw(char, DrawError),
}

impl From<io::Error> for FontError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ReadError> for FontError {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to open font: {e}"),
            Self::Read(e) => write!(f, "malformed font: {e}"),
            Self::Draw(ch, e) => write!(f, "failed to draw {ch:?}: {e}"),
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors produced while matching a single glyph.
#[derive(Clone, PartialEq, Debug)]
pub enum MatchError {
    /// Two bitmaps with different canvas sizes were compared.
    ///
    /// This is always a caller bug (mismatched render sizes) and is fatal
    /// to the whole resolution.
    DimensionMismatch { expected: Canvas, found: Canvas },
    /// No candidate survived pruning, or none scored above zero.
    Exhausted(char),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "bitmap dimensions differ: expected {}x{}, found {}x{}",
                expected.width, expected.height, found.width, found.height
            ),
            Self::Exhausted(ch) => write!(f, "no candidate matches the glyph mapped to {ch:?}"),
        }
    }
}

impl std::error::Error for MatchError {}

/// Errors raised by the bitmap cache.
///
/// Staleness is handled internally by rebuilding and is only visible to
/// callers that use [`BitmapCache::check`](crate::BitmapCache::check)
/// directly.
#[derive(Debug)]
pub enum CacheError {
    Io { path: PathBuf, source: io::Error },
    /// A persisted cache file exists but is not a valid cache.
    Format { path: PathBuf, reason: String },
    /// The cache lacks renderings for some guest characters.
    Stale { missing: Vec<char> },
    /// The reference font failed while building the cache.
    Font(FontError),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<FontError> for CacheError {
    fn from(e: FontError) -> Self {
        Self::Font(e)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error on '{}': {source}", path.display()),
            Self::Format { path, reason } => {
                write!(f, "invalid cache file '{}': {reason}", path.display())
            }
            Self::Stale { missing } => {
                write!(f, "cache is missing {} guest character(s)", missing.len())
            }
            Self::Font(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Font(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    /// A setting required by the requested operation is absent.
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config '{}': {source}", path.display())
            }
            Self::Parse(e) => write!(f, "invalid config: {e}"),
            Self::Missing(key) => write!(f, "missing config setting '{key}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fatal errors of a resolution.
///
/// Per glyph failures are not fatal; they are reported in
/// [`Resolution::failures`](crate::Resolution::failures).
#[derive(Debug)]
pub enum ResolveError {
    Font(FontError),
    Table(TableError),
    Cache(CacheError),
    Config(ConfigError),
    /// See [`MatchError::DimensionMismatch`].
    DimensionMismatch { expected: Canvas, found: Canvas },
}

impl From<FontError> for ResolveError {
    fn from(e: FontError) -> Self {
        Self::Font(e)
    }
}

impl From<TableError> for ResolveError {
    fn from(e: TableError) -> Self {
        Self::Table(e)
    }
}

impl From<CacheError> for ResolveError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}

impl From<ConfigError> for ResolveError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Font(e) => write!(f, "{e}"),
            Self::Table(e) => write!(f, "{e}"),
            Self::Cache(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "{}",
                MatchError::DimensionMismatch {
                    expected: *expected,
                    found: *found
                }
            ),
        }
    }
}

impl std::error::Error for ResolveError {}
