//! The tour layer: background computation of the track geometry, handed over
//! to the render loop.

pub mod cancel;
pub mod source;
pub mod tour_layer;
pub mod worker;

pub use source::TrackHandle;
pub use tour_layer::{LayerState, TourLayer};
pub use worker::{RenderTask, WorkerStats, WorkerStatus};
