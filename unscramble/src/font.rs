//! Font access.
//!
//! The matchers only need two capabilities from a font: the raw outline
//! points of a character's glyph and a monochrome rendering of it. These are
//! expressed by the [`OutlineFont`] and [`RasterFont`] traits and implemented
//! for skrifa in [`SkrifaFont`] and [`FontFile`].

use std::{
    borrow::Borrow,
    collections::BTreeMap,
    fs::File,
    hash::Hasher,
    path::Path,
    sync::Arc,
};

use coord_table::{Outline, Point, PLACEHOLDER};
use fnv::FnvHasher;
use skrifa::{
    outline::{DrawSettings, OutlinePen},
    prelude::{LocationRef, Size},
    raw::{tables::glyf::Glyph, FontRef, TableProvider},
    GlyphId, MetadataProvider,
};

use crate::{
    bitmap::{Canvas, GlyphBitmap},
    error::FontError,
    raster::{self, PathPen},
};

/// A font that exposes the raw outline points of its glyphs.
pub trait OutlineFont {
    /// All characters mapped by the font, in ascending order.
    fn codepoints(&self) -> Result<Vec<char>, FontError>;

    /// The raw point stream of the glyph mapped to `ch`.
    ///
    /// Returns `None` if the character is not mapped.
    fn outline(&self, ch: char) -> Result<Option<Outline>, FontError>;
}

/// A font that can render its glyphs.
pub trait RasterFont {
    /// Renders the glyph mapped to `ch` at `font_size` pixels per em,
    /// centered in `canvas`.
    ///
    /// Returns `None` if the character is not mapped.
    fn rasterize(
        &self,
        ch: char,
        font_size: f32,
        canvas: Canvas,
    ) -> Result<Option<GlyphBitmap>, FontError>;
}

impl<T: OutlineFont + ?Sized> OutlineFont for &T {
    fn codepoints(&self) -> Result<Vec<char>, FontError> {
        (**self).codepoints()
    }

    fn outline(&self, ch: char) -> Result<Option<Outline>, FontError> {
        (**self).outline(ch)
    }
}

impl<T: RasterFont + ?Sized> RasterFont for &T {
    fn rasterize(
        &self,
        ch: char,
        font_size: f32,
        canvas: Canvas,
    ) -> Result<Option<GlyphBitmap>, FontError> {
        (**self).rasterize(ch, font_size, canvas)
    }
}

/// Collects the outlines of every mapped character except the placeholder.
pub fn collect_outlines(font: &impl OutlineFont) -> Result<BTreeMap<char, Outline>, FontError> {
    let mut outlines = BTreeMap::new();
    for ch in font.codepoints()? {
        if ch == PLACEHOLDER {
            continue;
        }
        if let Some(outline) = font.outline(ch)? {
            outlines.insert(ch, outline);
        }
    }
    Ok(outlines)
}

/// Cheaply clonable font bytes, either owned or memory mapped.
#[derive(Clone)]
pub struct SharedFontData(Arc<FontBytes>);

enum FontBytes {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl SharedFontData {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(FontBytes::Owned(data.into())))
    }

    /// Maps the file at `path` into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read only. Modifying the file while it is
        // mapped is undefined behavior, which we accept as fonts are not
        // expected to change underneath us.
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Ok(Self(Arc::new(FontBytes::Mapped(map))))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self.0.as_ref() {
            FontBytes::Owned(data) => data,
            FontBytes::Mapped(map) => map,
        }
    }

    /// A stable identity for the font bytes: the 64-bit FNV-1a hash as
    /// 16 lowercase hex digits.
    pub fn content_hash(&self) -> String {
        let mut hasher = FnvHasher::default();
        hasher.write(self.as_bytes());
        format!("{:016x}", hasher.finish())
    }
}

impl Borrow<[u8]> for SharedFontData {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for SharedFontData {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for SharedFontData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.0.as_ref() {
            FontBytes::Owned(_) => "owned",
            FontBytes::Mapped(_) => "mapped",
        };
        write!(f, "SharedFontData({kind}, {} bytes)", self.as_bytes().len())
    }
}

/// Borrowed skrifa font.
#[derive(Clone)]
pub struct SkrifaFont<'a> {
    font: FontRef<'a>,
}

impl<'a> SkrifaFont<'a> {
    pub fn new(font: FontRef<'a>) -> Self {
        Self { font }
    }

    pub fn from_bytes(data: &'a [u8], index: u32) -> Result<Self, FontError> {
        Ok(Self::new(FontRef::from_index(data, index)?))
    }

    fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        self.font.charmap().map(ch)
    }

    /// Records the point stream produced by drawing the glyph unscaled.
    ///
    /// Used for glyphs that have no simple `glyf` representation.
    fn drawn_points(&self, ch: char, gid: GlyphId) -> Result<Outline, FontError> {
        let mut pen = PointPen::default();
        if let Some(glyph) = self.font.outline_glyphs().get(gid) {
            glyph
                .draw(
                    DrawSettings::unhinted(Size::unscaled(), LocationRef::default()),
                    &mut pen,
                )
                .map_err(|e| FontError::Draw(ch, e))?;
        }
        Ok(Outline::new(pen.points))
    }
}

impl OutlineFont for SkrifaFont<'_> {
    fn codepoints(&self) -> Result<Vec<char>, FontError> {
        let mut chars: Vec<char> = self
            .font
            .charmap()
            .mappings()
            .filter_map(|(codepoint, _)| char::from_u32(codepoint))
            .collect();
        chars.sort_unstable();
        chars.dedup();
        Ok(chars)
    }

    fn outline(&self, ch: char) -> Result<Option<Outline>, FontError> {
        let Some(gid) = self.glyph_id(ch) else {
            return Ok(None);
        };
        let (Ok(glyf), Ok(loca)) = (self.font.glyf(), self.font.loca(None)) else {
            return self.drawn_points(ch, gid).map(Some);
        };
        match loca.get_glyf(gid, &glyf)? {
            Some(Glyph::Simple(simple)) => Ok(Some(
                simple
                    .points()
                    .map(|point| Point::new(point.x as i32, point.y as i32))
                    .collect(),
            )),
            Some(Glyph::Composite(_)) => self.drawn_points(ch, gid).map(Some),
            None => Ok(Some(Outline::default())),
        }
    }
}

impl RasterFont for SkrifaFont<'_> {
    fn rasterize(
        &self,
        ch: char,
        font_size: f32,
        canvas: Canvas,
    ) -> Result<Option<GlyphBitmap>, FontError> {
        let Some(gid) = self.glyph_id(ch) else {
            return Ok(None);
        };
        let Some(glyph) = self.font.outline_glyphs().get(gid) else {
            return Ok(Some(GlyphBitmap::new(canvas)));
        };
        let mut pen = PathPen::new();
        glyph
            .draw(
                DrawSettings::unhinted(Size::new(font_size), LocationRef::default()),
                &mut pen,
            )
            .map_err(|e| FontError::Draw(ch, e))?;
        Ok(Some(raster::rasterize(&pen.into_path(), canvas)))
    }
}

/// A font that owns its data.
#[derive(Clone, Debug)]
pub struct FontFile {
    data: SharedFontData,
    index: u32,
}

impl FontFile {
    /// Creates a font from in-memory bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Result<Self, FontError> {
        Self::from_shared(SharedFontData::new(data), 0)
    }

    /// Memory maps the font file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FontError> {
        Self::from_shared(SharedFontData::open(path)?, 0)
    }

    /// Creates a font from shared data, selecting `index` in a collection.
    pub fn from_shared(data: SharedFontData, index: u32) -> Result<Self, FontError> {
        FontRef::from_index(data.as_bytes(), index)?;
        Ok(Self { data, index })
    }

    pub fn data(&self) -> &SharedFontData {
        &self.data
    }

    pub fn skrifa(&self) -> Result<SkrifaFont<'_>, FontError> {
        SkrifaFont::from_bytes(self.data.as_bytes(), self.index)
    }
}

impl OutlineFont for FontFile {
    fn codepoints(&self) -> Result<Vec<char>, FontError> {
        self.skrifa()?.codepoints()
    }

    fn outline(&self, ch: char) -> Result<Option<Outline>, FontError> {
        self.skrifa()?.outline(ch)
    }
}

impl RasterFont for FontFile {
    fn rasterize(
        &self,
        ch: char,
        font_size: f32,
        canvas: Canvas,
    ) -> Result<Option<GlyphBitmap>, FontError> {
        self.skrifa()?.rasterize(ch, font_size, canvas)
    }
}

/// Pen that records every on and off curve point it receives.
///
/// Close elements are dropped and coordinates truncated to integers, giving
/// the same point stream shape as a simple `glyf` glyph.
#[derive(Default)]
struct PointPen {
    points: Vec<Point>,
}

impl PointPen {
    fn push(&mut self, x: f32, y: f32) {
        self.points.push(Point::new(x.trunc() as i32, y.trunc() as i32));
    }
}

impl OutlinePen for PointPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.push(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(x, y);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.push(cx0, cy0);
        self.push(x, y);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.push(cx0, cy0);
        self.push(cx1, cy1);
        self.push(x, y);
    }

    fn close(&mut self) {}
}
