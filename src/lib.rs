//! Tourtrack - draw your tours on a map.
//!
//! This crate turns tours, series of geographic points, into pixel-space line
//! geometry for a pannable and zoomable map. The geometry is recomputed in a
//! background thread whenever the map moves to another tile, and handed over
//! to the render loop without ever blocking it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod map;
pub mod render;
pub mod track_data;
pub mod tracks;

pub use config::TrackConfig;
pub use error::InvalidTrackData;
pub use geometry::projection::GeoPoint;
pub use layer::{LayerState, TourLayer, TrackHandle};
pub use map::position::MapPosition;
pub use track_data::{Tour, TrackData};
