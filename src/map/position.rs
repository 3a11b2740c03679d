//! Pan and zoom state of the map, and the tile grid derived from it.

use crate::geometry::projection::{project, GeoPoint};
use crate::geometry::Point;

/// Size of a map tile, in pixels.
pub const TILE_SIZE: u32 = 256;

/// Maximum zoom level supported by the layer.
pub const MAX_ZOOM_LEVEL: u8 = 24;

/// Index of a tile in Mercator coordinates.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TileIndex {
    /// Zoom level.
    pub z: u32,
    /// Index from West to East.
    pub x: u32,
    /// Index from North to South.
    pub y: u32,
}

impl TileIndex {
    /// Returns the (left, top, width, height) rectangle occupied by this tile
    /// w.r.t. a world square of length 1.0.
    pub fn rect(&self) -> [f64; 4] {
        let size = 0.5_f64.powi(self.z as i32);
        [self.x as f64 * size, self.y as f64 * size, size, size]
    }
}

/// Position of the map: the center of the window in Mercator coordinates,
/// and an integer zoom level.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapPosition {
    /// Mercator X coordinate of the center, in `[0, 1]`.
    pub x: f64,
    /// Mercator Y coordinate of the center, in `[0, 1]`.
    pub y: f64,
    /// Zoom level. At level `z` the world is `2^z` tiles wide.
    pub zoom_level: u8,
}

impl MapPosition {
    /// Creates a position centered on the given Mercator coordinates.
    pub fn new(x: f64, y: f64, zoom_level: u8) -> Self {
        Self {
            x,
            y,
            zoom_level: zoom_level.min(MAX_ZOOM_LEVEL),
        }
    }

    /// Creates a position centered on the given geographic coordinate.
    pub fn from_geo(center: &GeoPoint, zoom_level: u8) -> Self {
        let p = project(center);
        Self::new(p.x, p.y, zoom_level)
    }

    /// Number of tiles along each axis of the world.
    pub fn scale(&self) -> f64 {
        (1u32 << self.zoom_level.min(MAX_ZOOM_LEVEL)) as f64
    }

    /// Width (and height) of the whole world, in pixels.
    pub fn world_pixels(&self) -> f64 {
        TILE_SIZE as f64 * self.scale()
    }

    /// Returns the tile containing the center of the map.
    pub fn tile_index(&self) -> TileIndex {
        let scale = self.scale();
        let max = scale - 1.0;
        TileIndex {
            z: self.zoom_level.min(MAX_ZOOM_LEVEL) as u32,
            x: (self.x * scale).floor().clamp(0.0, max) as u32,
            y: (self.y * scale).floor().clamp(0.0, max) as u32,
        }
    }

    /// Returns the position moved by the given number of pixels.
    pub fn pan_pixels(&self, dx: f64, dy: f64) -> Self {
        let world = self.world_pixels();
        Self {
            x: (self.x + dx / world).rem_euclid(1.0),
            y: (self.y + dy / world).clamp(0.0, 1.0),
            zoom_level: self.zoom_level,
        }
    }
}

/// Transformation placing pixels computed for one [`MapPosition`] onto a
/// viewport at another position.
///
/// A vertex `v` built for position `built` is drawn at `v * scale +
/// translate`, relative to the center of the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTransform {
    /// Translation, in viewport pixels.
    pub translate: Point<f64>,
    /// Ratio between the viewport zoom and the zoom the vertices were built
    /// at.
    pub scale: f64,
}

impl RenderTransform {
    /// The identity transform.
    pub const IDENTITY: RenderTransform = RenderTransform {
        translate: Point { x: 0.0, y: 0.0 },
        scale: 1.0,
    };

    /// Computes the transform from `built` to `viewport`.
    ///
    /// The horizontal offset wraps around the dateline, so that vertices are
    /// always drawn on the copy of the world closest to the viewport.
    pub fn between(built: &MapPosition, viewport: &MapPosition) -> Self {
        let mut dx = built.x - viewport.x;
        dx -= dx.round();
        let dy = built.y - viewport.y;

        let world = viewport.world_pixels();
        Self {
            translate: Point {
                x: dx * world,
                y: dy * world,
            },
            scale: viewport.scale() / built.scale(),
        }
    }

    /// Applies this transform to a pixel.
    pub fn apply(&self, p: Point<f32>) -> Point<f64> {
        Point {
            x: p.x as f64 * self.scale + self.translate.x,
            y: p.y as f64 * self.scale + self.translate.y,
        }
    }
}
