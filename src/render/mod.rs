//! Conversion of tracks into pixel-space geometry for a renderer.

pub mod buckets;
pub mod builder;
pub mod style;
