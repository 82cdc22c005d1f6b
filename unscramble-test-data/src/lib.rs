//! Test data shared between the unscramble crates.
//!
//! The [`FontBuilder`] compiles minimal TrueType fonts from polygon contours
//! with write-fonts, so tests can exercise the real font parsing and
//! rasterization paths without binary fixtures.

pub mod shapes;

use std::collections::BTreeMap;

use kurbo::BezPath;
use write_fonts::{
    tables::{
        cmap::Cmap,
        glyf::{Bbox, GlyfLocaBuilder, SimpleGlyph},
        head::Head,
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        maxp::Maxp,
    },
    types::{FWord, GlyphId, UfWord},
};

/// A single closed contour of on-curve points in font units.
pub type Contour = Vec<(i16, i16)>;

/// Builder for small `glyf` based fonts.
///
/// Glyph 0 is always an empty `.notdef`. Every glyph has an advance of one
/// em.
#[derive(Clone, Debug)]
pub struct FontBuilder {
    units_per_em: u16,
    glyphs: Vec<Vec<Contour>>,
    cmap: BTreeMap<char, u16>,
}

impl Default for FontBuilder {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl FontBuilder {
    pub fn new(units_per_em: u16) -> Self {
        Self {
            units_per_em,
            glyphs: vec![Vec::new()],
            cmap: BTreeMap::new(),
        }
    }

    /// Adds a glyph and returns its id.
    pub fn add_glyph(&mut self, contours: Vec<Contour>) -> u16 {
        self.glyphs.push(contours);
        (self.glyphs.len() - 1) as u16
    }

    /// Maps a character to a glyph id.
    pub fn map(&mut self, ch: char, gid: u16) -> &mut Self {
        self.cmap.insert(ch, gid);
        self
    }

    /// Adds a glyph and maps `ch` to it.
    pub fn add_char(&mut self, ch: char, contours: Vec<Contour>) -> &mut Self {
        let gid = self.add_glyph(contours);
        self.map(ch, gid)
    }

    /// Returns the font data.
    pub fn build(&self) -> Vec<u8> {
        let glyphs: Vec<SimpleGlyph> = self.glyphs.iter().map(|c| simple_glyph(c)).collect();
        let mut glyf_loca = GlyfLocaBuilder::new();
        for glyph in &glyphs {
            glyf_loca.add_glyph(glyph).expect("glyph should compile");
        }
        let (glyf, loca, loca_format) = glyf_loca.build();
        let bbox = glyphs
            .iter()
            .filter(|glyph| !glyph.contours.is_empty())
            .map(|glyph| glyph.bbox)
            .reduce(Bbox::union)
            .unwrap_or_default();

        let upem = self.units_per_em;
        let num_glyphs = glyphs.len() as u16;
        let head = Head {
            units_per_em: upem,
            x_min: bbox.x_min,
            y_min: bbox.y_min,
            x_max: bbox.x_max,
            y_max: bbox.y_max,
            lowest_rec_ppem: 8,
            index_to_loc_format: loca_format as i16,
            ..Default::default()
        };
        let hhea = Hhea {
            ascender: FWord::new((upem / 5 * 4) as i16),
            descender: FWord::new(-((upem / 5) as i16)),
            advance_width_max: UfWord::new(upem),
            x_max_extent: FWord::new(upem as i16),
            caret_slope_rise: 1,
            number_of_h_metrics: num_glyphs,
            ..Default::default()
        };
        let hmtx = Hmtx {
            h_metrics: glyphs
                .iter()
                .map(|glyph| LongMetric {
                    advance: upem,
                    side_bearing: glyph.bbox.x_min,
                })
                .collect(),
            left_side_bearings: Vec::new(),
        };
        let maxp = Maxp {
            num_glyphs,
            ..Default::default()
        };
        let cmap = Cmap::from_mappings(
            self.cmap
                .iter()
                .map(|(ch, gid)| (*ch, GlyphId::new(*gid as u32))),
        )
        .expect("cmap has one glyph per character");

        let mut builder = write_fonts::FontBuilder::new();
        builder
            .add_table(&cmap)
            .and_then(|b| b.add_table(&glyf))
            .and_then(|b| b.add_table(&head))
            .and_then(|b| b.add_table(&hhea))
            .and_then(|b| b.add_table(&hmtx))
            .and_then(|b| b.add_table(&loca))
            .and_then(|b| b.add_table(&maxp))
            .expect("tables should compile");
        builder.build()
    }
}

/// Compiles polygon contours into a simple glyph, keeping every point.
fn simple_glyph(contours: &[Contour]) -> SimpleGlyph {
    let mut path = BezPath::new();
    for contour in contours {
        let mut points = contour.iter().map(|(x, y)| (*x as f64, *y as f64));
        let Some(start) = points.next() else {
            continue;
        };
        path.move_to(start);
        for point in points {
            path.line_to(point);
        }
        path.close_path();
    }
    if path.elements().is_empty() {
        return SimpleGlyph::default();
    }
    SimpleGlyph::from_bezpath(&path).expect("contours are lines only")
}
