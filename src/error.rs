//! Errors of the tour-track layer.

/// Track data rejected by [`crate::layer::TourLayer::set_points()`].
///
/// Nothing is applied when this error is returned: the previous track stays
/// displayed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTrackData {
    /// The number of colors differs from the number of points.
    #[error("Got {colors} colors for {points} points")]
    ColorCountMismatch {
        /// Number of points.
        points: usize,
        /// Number of colors.
        colors: usize,
    },

    /// A tour starts past the last point.
    #[error("Tour start {start} is out of range for {points} points")]
    TourStartOutOfRange {
        /// Index of the first point of the tour.
        start: usize,
        /// Number of points.
        points: usize,
    },

    /// Tour starts are not strictly increasing.
    #[error("Tour start {start} follows tour start {previous}")]
    TourStartsNotIncreasing {
        /// Previous tour start.
        previous: usize,
        /// Offending tour start.
        start: usize,
    },
}

/// A geometry computation was cancelled before completion.
///
/// This never leaves the crate: a cancelled computation simply produces no
/// result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Geometry computation was cancelled")]
pub(crate) struct WorkerCancelled;
