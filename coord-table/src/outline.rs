//! Raw glyph outline coordinates and their comparison.

use serde::{Deserialize, Serialize};

/// Default tolerance, in font units, for [`Outline::fuzzy_eq`].
pub const DEFAULT_FUZZ: i32 = 20;

/// A single outline coordinate in font design units.
///
/// Serialized as a two element `[x, y]` array.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns true if both components differ by no more than `fuzz`.
    #[inline]
    pub fn is_near(self, other: Point, fuzz: i32) -> bool {
        (self.x - other.x).abs() <= fuzz && (self.y - other.y).abs() <= fuzz
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

/// The ordered point list of a glyph, as stored in the font.
///
/// Order is significant: this is the raw contour point stream, on and off
/// curve points alike, not a set of coordinates.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline(Vec<Point>);

impl Outline {
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Point for point equality.
    ///
    /// Two outlines match only if they have the same number of points and
    /// every pair of corresponding points is identical.
    pub fn exact_eq(&self, other: &Outline) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.x == b.x && a.y == b.y)
    }

    /// Tolerant equality used by the quick path.
    ///
    /// Requires the same number of points and every corresponding x and y to
    /// differ by at most `fuzz` (inclusive).
    pub fn fuzzy_eq(&self, other: &Outline, fuzz: i32) -> bool {
        self.len() == other.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.is_near(*b, fuzz))
    }
}

impl From<Vec<Point>> for Outline {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl<const N: usize> From<[(i32, i32); N]> for Outline {
    fn from(points: [(i32, i32); N]) -> Self {
        Self(points.into_iter().map(Point::from).collect())
    }
}

impl FromIterator<Point> for Outline {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
