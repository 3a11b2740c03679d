//! Module describing where the map is looking at.

pub mod position;
