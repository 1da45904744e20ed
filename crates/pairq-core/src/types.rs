//! Problem model shared across pairq crates

use serde::{Deserialize, Serialize};

use crate::error::{PairqError, Result};

/// Largest coordinate magnitude a problem may carry; keeps distance,
/// rounding and orientation arithmetic exact
pub const MAX_COORDINATE: i64 = 1 << 40;

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate
    pub fn distance(&self, other: &Coord) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        dx.hypot(dy)
    }
}

/// A pair of locations that must be connected.
///
/// Ordering is lexicographic over `(from.x, from.y, to.x, to.y)`, which is the
/// order canonical problems are sorted by. Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct Point {
    pub from: Coord,
    pub to: Coord,
}

impl Point {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self {
            from: Coord::new(x1, y1),
            to: Coord::new(x2, y2),
        }
    }

    /// Straight-line length between the two locations
    pub fn span(&self) -> f64 {
        self.from.distance(&self.to)
    }

    /// The four coordinate values in lexicographic key order
    pub fn components(&self) -> [i64; 4] {
        [self.from.x, self.from.y, self.to.x, self.to.y]
    }

    /// Apply `f` to every coordinate value
    pub fn map(&self, f: impl Fn(i64) -> i64) -> Self {
        Self::new(f(self.from.x), f(self.from.y), f(self.to.x), f(self.to.y))
    }
}

impl From<[i64; 4]> for Point {
    fn from(c: [i64; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<Point> for [i64; 4] {
    fn from(p: Point) -> Self {
        p.components()
    }
}

/// An ordered set of points to connect. Compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Problem {
    points: Vec<Point>,
}

impl Problem {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    /// Reject problems with a coordinate beyond `±MAX_COORDINATE`
    pub fn check_coordinates(&self) -> Result<()> {
        for (index, point) in self.points.iter().enumerate() {
            if let Some(value) = point
                .components()
                .into_iter()
                .find(|c| c.unsigned_abs() > MAX_COORDINATE.unsigned_abs())
            {
                return Err(PairqError::InvalidProblem(format!(
                    "point {index} has coordinate {value} outside ±{MAX_COORDINATE}"
                )));
            }
        }
        Ok(())
    }

    /// Indices that do not appear in `chosen`, in ascending order
    pub fn unchosen(&self, chosen: &[usize]) -> Vec<usize> {
        (0..self.len()).filter(|i| !chosen.contains(i)).collect()
    }
}

impl From<Vec<Point>> for Problem {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

impl std::ops::Index<usize> for Problem {
    type Output = Point;

    fn index(&self, index: usize) -> &Point {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a Problem {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Result of scoring a (possibly partial) order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// The order as the evaluator understood it
    pub order: Vec<usize>,
    pub success: bool,
    /// Raw cost; lower is better
    pub measure: f64,
}

impl Evaluation {
    pub fn new(order: Vec<usize>, success: bool, measure: f64) -> Self {
        Self {
            order,
            success,
            measure,
        }
    }
}
