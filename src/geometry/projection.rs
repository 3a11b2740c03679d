//! Conversion of latitude-longitude coordinates into Mercator's projection.
//!
//! Under Mercator coordinates, the whole world is a unit square: `x` grows
//! from West (0.0) to East (1.0) and `y` from North (0.0) to South (1.0).

use super::Point;
use std::f64::consts::PI;

/// Maximum latitude representable in the square Web-Mercator world.
pub const LATITUDE_MAX: f64 = 85.051_128_779_806_59;

/// Maximum absolute longitude.
pub const LONGITUDE_MAX: f64 = 180.0;

/// A geographic coordinate, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeoPoint {
    /// Latitude, positive towards the North.
    pub latitude: f64,
    /// Longitude, positive towards the East.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a coordinate from a latitude and longitude in degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Converts the coordinates into Mercator's projection.
    pub fn as_mercator(&self) -> Point<f64> {
        project(self)
    }
}

/// Projects a geographic coordinate into Mercator coordinates in `[0, 1]`.
///
/// Out-of-range latitudes and longitudes are clamped, never rejected.
pub fn project(point: &GeoPoint) -> Point<f64> {
    let lat = clamp_or_zero(point.latitude, LATITUDE_MAX);
    let lon = clamp_or_zero(point.longitude, LONGITUDE_MAX);

    let x = 0.5 + lon / 360.0;
    let s = lat.to_radians().tan().asinh();
    let y = 0.5 - s / (2.0 * PI);

    Point {
        x: x.clamp(0.0, 1.0),
        y: y.clamp(0.0, 1.0),
    }
}

/// Converts Mercator coordinates back into a geographic coordinate.
pub fn unproject(point: Point<f64>) -> GeoPoint {
    let longitude = (point.x - 0.5) * 360.0;
    let latitude = ((0.5 - point.y) * 2.0 * PI).sinh().atan().to_degrees();
    GeoPoint {
        latitude,
        longitude,
    }
}

/// Clamps `value` to `[-max, max]`, mapping NaN to zero.
fn clamp_or_zero(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-max, max)
    }
}
