//! Geometric primitives: points, the Mercator projection and line clipping.

pub mod clipper;
pub mod projection;

/// Data structure representing a point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point<T> {
    /// X coordinate.
    pub x: T,
    /// Y coordinate.
    pub y: T,
}

impl<T> Point<T> {
    /// Creates a point from its coordinates.
    pub const fn new(x: T, y: T) -> Self {
        Point { x, y }
    }
}

impl Point<f32> {
    /// Checks whether the given point is further than `distance` along either
    /// axis.
    pub fn further_than(&self, other: &Point<f32>, distance: f32) -> bool {
        (self.x - other.x).abs() > distance || (self.y - other.y).abs() > distance
    }
}
