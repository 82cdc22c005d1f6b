//! Monochrome glyph bitmaps.

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Size, in pixels per em, at which glyphs are rendered for comparison.
pub const DEFAULT_FONT_SIZE: f32 = 96.0;

/// Ratio of canvas side to font size.
pub const DEFAULT_LINE_HEIGHT: f32 = 1.2;

/// Dimensions of the square raster that glyphs are rendered into.
///
/// Bitmaps are only comparable when their canvases are equal.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The square canvas for text at `font_size` with the given line height
    /// factor: `ceil(font_size * line_height)` on each side.
    pub fn for_font_size(font_size: f32, line_height: f32) -> Self {
        let side = (font_size * line_height).ceil().max(1.0) as u32;
        Self::new(side, side)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn word_count(&self) -> usize {
        self.pixel_count().div_ceil(64)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::for_font_size(DEFAULT_FONT_SIZE, DEFAULT_LINE_HEIGHT)
    }
}

/// A bit packed, row major, monochrome raster.
///
/// Set bits are ink.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "PackedBitmap")]
pub struct GlyphBitmap {
    canvas: Canvas,
    words: Vec<u64>,
}

/// Serialized form of a [`GlyphBitmap`], checked on the way in.
#[derive(Deserialize)]
struct PackedBitmap {
    canvas: Canvas,
    words: Vec<u64>,
}

impl TryFrom<PackedBitmap> for GlyphBitmap {
    type Error = String;

    fn try_from(packed: PackedBitmap) -> Result<Self, Self::Error> {
        let (width, height, len) = (packed.canvas.width, packed.canvas.height, packed.words.len());
        GlyphBitmap::from_words(packed.canvas, packed.words)
            .ok_or_else(|| format!("{len} words do not form a {width}x{height} bitmap"))
    }
}

impl GlyphBitmap {
    /// Creates a bitmap with no ink.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            words: vec![0; canvas.word_count()],
        }
    }

    /// Creates a bitmap by evaluating `is_ink` at every pixel.
    pub fn from_fn(canvas: Canvas, mut is_ink: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bitmap = Self::new(canvas);
        for y in 0..canvas.height {
            for x in 0..canvas.width {
                if is_ink(x, y) {
                    bitmap.set(x, y);
                }
            }
        }
        bitmap
    }

    /// Creates a bitmap from packed words.
    ///
    /// Returns `None` if the number of words does not fit the canvas or if
    /// any bit past the last pixel is set.
    pub fn from_words(canvas: Canvas, words: Vec<u64>) -> Option<Self> {
        if words.len() != canvas.word_count() {
            return None;
        }
        let tail = canvas.pixel_count() % 64;
        if tail != 0 {
            let last = *words.last()?;
            if last >> tail != 0 {
                return None;
            }
        }
        Some(Self { canvas, words })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> (usize, u64) {
        let bit = y as usize * self.canvas.width as usize + x as usize;
        (bit / 64, 1 << (bit % 64))
    }

    /// Returns true if the pixel at `(x, y)` is ink. Out of range pixels are
    /// blank.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.canvas.width || y >= self.canvas.height {
            return false;
        }
        let (word, mask) = self.index(x, y);
        self.words[word] & mask != 0
    }

    /// Marks the pixel at `(x, y)` as ink. Out of range pixels are ignored.
    pub fn set(&mut self, x: u32, y: u32) {
        if x >= self.canvas.width || y >= self.canvas.height {
            return;
        }
        let (word, mask) = self.index(x, y);
        self.words[word] |= mask;
    }

    /// Number of ink pixels.
    pub fn ink_count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Fraction of the canvas covered by ink.
    pub fn black_ratio(&self) -> f64 {
        let total = self.canvas.pixel_count();
        if total == 0 {
            return 0.0;
        }
        self.ink_count() as f64 / total as f64
    }

    /// Number of pixels that are ink in both bitmaps.
    pub fn overlap(&self, other: &GlyphBitmap) -> Result<u32, MatchError> {
        if self.canvas != other.canvas {
            return Err(MatchError::DimensionMismatch {
                expected: self.canvas,
                found: other.canvas,
            });
        }
        Ok(self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones())
            .sum())
    }

    /// Bounding box of the ink as `(x0, y0, x1, y1)`, exclusive on the max
    /// side.
    pub fn ink_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..self.canvas.height {
            for x in 0..self.canvas.width {
                if self.get(x, y) {
                    bounds = Some(match bounds {
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
                        None => (x, y, x + 1, y + 1),
                    });
                }
            }
        }
        bounds
    }
}
