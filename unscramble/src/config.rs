//! Engine settings.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    bitmap::{Canvas, DEFAULT_FONT_SIZE, DEFAULT_LINE_HEIGHT},
    error::ConfigError,
    slow::DEFAULT_RATIO_TOLERANCE,
};

/// Tunable parameters and file locations for a [`Resolver`](crate::Resolver).
///
/// Every field has a default, so an empty TOML document is a valid config:
///
/// ```toml
/// fuzz = 20
/// ratio_tolerance = 0.2
/// font_size = 96.0
/// line_height = 1.2
/// coord_table_path = "data/coor_table.json"
/// baseline_table_path = "data/baseline.json"
/// cache_dir = "cache"
/// reference_font_path = "fonts/reference.ttf"
/// supplementary_chars = "的一是"
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Per coordinate tolerance of the quick matcher, in font units.
    pub fuzz: i32,
    /// Maximum relative black ratio difference of slow match candidates.
    pub ratio_tolerance: f64,
    /// Render size in pixels per em.
    pub font_size: f32,
    /// Canvas side as a multiple of the font size.
    pub line_height: f32,
    /// The persisted coordinate table.
    pub coord_table_path: Option<PathBuf>,
    /// Table merged into the persisted table when it is opened.
    pub baseline_table_path: Option<PathBuf>,
    /// Directory holding the bitmap cache.
    pub cache_dir: Option<PathBuf>,
    /// Font used to render the guest range.
    pub reference_font_path: Option<PathBuf>,
    /// Characters added to the guest range beyond those in the table.
    pub supplementary_chars: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzz: coord_table::DEFAULT_FUZZ,
            ratio_tolerance: DEFAULT_RATIO_TOLERANCE,
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            coord_table_path: None,
            baseline_table_path: None,
            cache_dir: None,
            reference_font_path: None,
            supplementary_chars: String::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(ConfigError::Parse)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// The canvas glyphs are rendered into.
    pub fn canvas(&self) -> Canvas {
        Canvas::for_font_size(self.font_size, self.line_height)
    }

    pub fn supplementary(&self) -> impl Iterator<Item = char> + '_ {
        self.supplementary_chars.chars()
    }
}
