//! Clipping of polylines against a rectangular region, following the
//! Cohen-Sutherland algorithm.

use super::Point;

/// Classification of the segment between the previous point of a polyline and
/// the point just added.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipResult {
    /// Both endpoints are inside the region.
    Inside,
    /// The segment doesn't touch the region.
    Outside,
    /// The segment crosses the border of the region. The clipped part is
    /// available via [`LineClipper::line()`].
    Intersection,
}

/// Outcode bits.
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

/// Clips a connected polyline, one point at a time, against a fixed
/// rectangle.
#[derive(Clone, Debug)]
pub struct LineClipper {
    /// Inclusive minimum corner of the region.
    min: Point<f32>,
    /// Inclusive maximum corner of the region.
    max: Point<f32>,
    /// Last point of the polyline.
    prev: Point<f32>,
    /// Outcode of the last point.
    prev_code: u8,
    /// Clipped segment of the last intersection.
    line: [Point<f32>; 2],
}

impl LineClipper {
    /// Creates a clipper for the rectangle spanning `min` to `max`.
    pub fn new(min: Point<f32>, max: Point<f32>) -> Self {
        Self {
            min,
            max,
            prev: Point::default(),
            prev_code: 0,
            line: [Point::default(); 2],
        }
    }

    /// Creates a clipper for a square of half-size `extent` centered on the
    /// origin.
    pub fn centered(extent: f32) -> Self {
        Self::new(Point::new(-extent, -extent), Point::new(extent, extent))
    }

    /// Starts a new polyline at the given point.
    pub fn clip_start(&mut self, x: f32, y: f32) {
        self.prev = Point { x, y };
        self.prev_code = self.outcode(x, y);
    }

    /// Advances the polyline to the given point, classifying the segment from
    /// the previous point.
    pub fn clip_next(&mut self, x: f32, y: f32) -> ClipResult {
        let code = self.outcode(x, y);
        let next = Point { x, y };

        let result = if self.prev_code | code == 0 {
            ClipResult::Inside
        } else if self.prev_code & code != 0 {
            ClipResult::Outside
        } else if self.clip(self.prev, self.prev_code, next, code) {
            ClipResult::Intersection
        } else {
            ClipResult::Outside
        };

        self.prev = next;
        self.prev_code = code;
        result
    }

    /// Returns the clipped segment of the last [`ClipResult::Intersection`].
    ///
    /// Endpoints that were inside the region are returned unchanged.
    pub fn line(&self) -> (Point<f32>, Point<f32>) {
        (self.line[0], self.line[1])
    }

    /// Checks whether the last point of the polyline is inside the region.
    pub fn is_inside(&self) -> bool {
        self.prev_code == 0
    }

    /// Checks whether the given point is inside the region.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.outcode(x, y) == 0
    }

    fn outcode(&self, x: f32, y: f32) -> u8 {
        let mut code = 0;
        if x < self.min.x {
            code |= LEFT;
        } else if x > self.max.x {
            code |= RIGHT;
        }
        if y < self.min.y {
            code |= BOTTOM;
        } else if y > self.max.y {
            code |= TOP;
        }
        code
    }

    /// Clips the segment `p0`-`p1` to the region, storing the result in
    /// `self.line`. Returns `false` if nothing of the segment is visible.
    fn clip(&mut self, mut p0: Point<f32>, mut c0: u8, mut p1: Point<f32>, mut c1: u8) -> bool {
        // Each round moves one endpoint onto a border, so 4 rounds suffice.
        for _ in 0..4 {
            if c0 | c1 == 0 {
                self.line = [p0, p1];
                return true;
            }
            if c0 & c1 != 0 {
                return false;
            }

            let out = if c0 != 0 { c0 } else { c1 };
            let (from, to) = (p0, p1);
            let p = if out & TOP != 0 {
                Point {
                    x: from.x + (to.x - from.x) * (self.max.y - from.y) / (to.y - from.y),
                    y: self.max.y,
                }
            } else if out & BOTTOM != 0 {
                Point {
                    x: from.x + (to.x - from.x) * (self.min.y - from.y) / (to.y - from.y),
                    y: self.min.y,
                }
            } else if out & RIGHT != 0 {
                Point {
                    x: self.max.x,
                    y: from.y + (to.y - from.y) * (self.max.x - from.x) / (to.x - from.x),
                }
            } else {
                Point {
                    x: self.min.x,
                    y: from.y + (to.y - from.y) * (self.min.x - from.x) / (to.x - from.x),
                }
            };
            if out == c0 {
                p0 = p;
                c0 = self.outcode(p.x, p.y);
            } else {
                p1 = p;
                c1 = self.outcode(p.x, p.y);
            }
        }

        if c0 | c1 == 0 {
            self.line = [p0, p1];
            true
        } else {
            false
        }
    }
}
