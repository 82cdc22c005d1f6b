//! Simple polygon contours, wound clockwise as TrueType expects for outer
//! contours.

use crate::Contour;

/// Axis aligned rectangle from `(x0, y0)` to `(x1, y1)`.
pub fn rect(x0: i16, y0: i16, x1: i16, y1: i16) -> Contour {
    vec![(x0, y0), (x0, y1), (x1, y1), (x1, y0)]
}

/// Square with lower left corner at `(x, y)`.
pub fn square(x: i16, y: i16, size: i16) -> Contour {
    rect(x, y, x + size, y + size)
}

/// Counter-clockwise rectangle, used to punch holes.
pub fn hole(x0: i16, y0: i16, x1: i16, y1: i16) -> Contour {
    vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
}

/// Hollow rectangle: an outer contour and an inner hole.
pub fn frame(x0: i16, y0: i16, x1: i16, y1: i16, thickness: i16) -> Vec<Contour> {
    vec![
        rect(x0, y0, x1, y1),
        hole(x0 + thickness, y0 + thickness, x1 - thickness, y1 - thickness),
    ]
}

/// `count` evenly spaced horizontal bars, like 一, 二 and 三.
pub fn bars(count: i16) -> Vec<Contour> {
    let gap = 700 / count.max(1);
    (0..count)
        .map(|i| {
            let y = 100 + i * gap;
            rect(100, y, 900, y + 80)
        })
        .collect()
}

/// Plus sign made of two overlapping bars, like 十.
pub fn cross() -> Vec<Contour> {
    vec![rect(100, 410, 900, 490), rect(460, 50, 540, 850)]
}

/// Right triangle.
pub fn triangle(x: i16, y: i16, size: i16) -> Contour {
    vec![(x, y), (x, y + size), (x + size, y)]
}
