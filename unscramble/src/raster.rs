//! Scan conversion of glyph outlines into monochrome bitmaps.
//!
//! Outlines are captured from skrifa with [`PathPen`] and filled by zeno
//! with the nonzero winding rule. The coverage mask is thresholded to
//! monochrome: a pixel at least half covered is ink.
//!
//! The ink is centered in the canvas on both axes.

use kurbo::{Affine, BezPath, PathEl, Point};
use skrifa::outline::OutlinePen;
use zeno::{Command, Fill, Format, Mask, Vector};

use crate::bitmap::{Canvas, GlyphBitmap};

/// Minimum coverage for a pixel to count as ink.
const INK_THRESHOLD: u8 = 128;

/// Pen that records a skrifa outline as a kurbo path.
#[derive(Clone, Default, Debug)]
pub struct PathPen {
    path: BezPath,
}

impl PathPen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_path(self) -> BezPath {
        self.path
    }
}

impl OutlinePen for PathPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.path
            .quad_to((cx0 as f64, cy0 as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.path.curve_to(
            (cx0 as f64, cy0 as f64),
            (cx1 as f64, cy1 as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

/// Converts a path to zeno commands, closing any open subpath.
fn to_commands(path: &BezPath) -> Vec<Command> {
    let vector = |p: Point| Vector::new(p.x as f32, p.y as f32);
    let mut commands = Vec::with_capacity(path.elements().len() + 1);
    let mut open = false;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                if open {
                    commands.push(Command::Close);
                }
                commands.push(Command::MoveTo(vector(p)));
                open = true;
            }
            PathEl::LineTo(p) => commands.push(Command::LineTo(vector(p))),
            PathEl::QuadTo(p1, p2) => commands.push(Command::QuadTo(vector(p1), vector(p2))),
            PathEl::CurveTo(p1, p2, p3) => {
                commands.push(Command::CurveTo(vector(p1), vector(p2), vector(p3)))
            }
            PathEl::ClosePath => {
                commands.push(Command::Close);
                open = false;
            }
        }
    }
    if open {
        commands.push(Command::Close);
    }
    commands
}

/// Renders a path, in y-up font coordinates scaled to pixels, into a new
/// bitmap with the ink centered on both axes.
pub fn rasterize(path: &BezPath, canvas: Canvas) -> GlyphBitmap {
    let mut bitmap = GlyphBitmap::new(canvas);
    // zeno renders y-down
    let commands = to_commands(&(Affine::FLIP_Y * path.clone()));
    if commands.is_empty() {
        return bitmap;
    }
    let (mask, placement) = Mask::new(&commands[..])
        .format(Format::Alpha)
        .style(Fill::NonZero)
        .render();
    let (width, height) = (placement.width as usize, placement.height as usize);
    let is_ink = |x: usize, y: usize| mask[y * width + x] >= INK_THRESHOLD;
    let Some((x0, y0, x1, y1)) = ink_bounds(width, height, &is_ink) else {
        return bitmap;
    };
    let dx = (canvas.width as i64 - (x1 - x0) as i64).div_euclid(2) - x0 as i64;
    let dy = (canvas.height as i64 - (y1 - y0) as i64).div_euclid(2) - y0 as i64;
    for y in y0..y1 {
        for x in x0..x1 {
            let (cx, cy) = (x as i64 + dx, y as i64 + dy);
            if is_ink(x, y) && cx >= 0 && cy >= 0 {
                bitmap.set(cx as u32, cy as u32);
            }
        }
    }
    bitmap
}

/// Bounds of the ink in a `width` by `height` mask, as `(x0, y0, x1, y1)`
/// with exclusive maxima.
fn ink_bounds(
    width: usize,
    height: usize,
    is_ink: impl Fn(usize, usize) -> bool,
) -> Option<(usize, usize, usize, usize)> {
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for y in 0..height {
        for x in (0..width).filter(|x| is_ink(*x, y)) {
            bounds = Some(match bounds {
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
                None => (x, y, x + 1, y + 1),
            });
        }
    }
    bounds
}
