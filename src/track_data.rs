//! Validated set of tours handed over to the layer.

use crate::error::InvalidTrackData;
use crate::geometry::projection::GeoPoint;
use std::sync::Arc;

/// A single tour: a series of points with one ARGB color per point.
#[derive(Clone, Debug, Default)]
pub struct Tour {
    /// Points of the tour, in recording order.
    pub points: Vec<GeoPoint>,
    /// Packed ARGB color of each point.
    pub colors: Vec<u32>,
}

impl Tour {
    /// Creates a tour drawn with a single color.
    pub fn with_color(points: Vec<GeoPoint>, color: u32) -> Self {
        let colors = vec![color; points.len()];
        Self { points, colors }
    }
}

/// Points, colors and tour boundaries of all the tours displayed by a layer.
///
/// The arrays are immutable and reference-counted: replacing the track swaps
/// the whole set, and taking a snapshot only clones references.
#[derive(Clone, Debug)]
pub struct TrackData {
    /// Concatenated points of all the tours.
    points: Arc<[GeoPoint]>,
    /// Packed ARGB color of each point.
    colors: Arc<[u32]>,
    /// Index of the first point of each tour, strictly increasing.
    tour_starts: Arc<[usize]>,
}

impl Default for TrackData {
    fn default() -> Self {
        Self {
            points: Arc::new([]),
            colors: Arc::new([]),
            tour_starts: Arc::new([]),
        }
    }
}

impl TrackData {
    /// Validates and wraps the given arrays.
    ///
    /// A leading `0` in `tour_starts` is optional.
    pub fn new(
        points: impl Into<Arc<[GeoPoint]>>,
        colors: impl Into<Arc<[u32]>>,
        tour_starts: impl Into<Arc<[usize]>>,
    ) -> Result<Self, InvalidTrackData> {
        let points = points.into();
        let colors = colors.into();
        let tour_starts = tour_starts.into();

        if points.len() != colors.len() {
            return Err(InvalidTrackData::ColorCountMismatch {
                points: points.len(),
                colors: colors.len(),
            });
        }

        let mut previous: Option<usize> = None;
        for &start in tour_starts.iter() {
            if start >= points.len() {
                return Err(InvalidTrackData::TourStartOutOfRange {
                    start,
                    points: points.len(),
                });
            }
            if let Some(previous) = previous {
                if start <= previous {
                    return Err(InvalidTrackData::TourStartsNotIncreasing { previous, start });
                }
            }
            previous = Some(start);
        }

        Ok(Self {
            points,
            colors,
            tour_starts,
        })
    }

    /// Concatenates the given tours.
    pub fn from_tours(tours: &[Tour]) -> Result<Self, InvalidTrackData> {
        let total: usize = tours.iter().map(|t| t.points.len()).sum();
        let mut points = Vec::with_capacity(total);
        let mut colors = Vec::with_capacity(total);
        let mut tour_starts = Vec::with_capacity(tours.len());

        for tour in tours {
            if tour.points.len() != tour.colors.len() {
                return Err(InvalidTrackData::ColorCountMismatch {
                    points: tour.points.len(),
                    colors: tour.colors.len(),
                });
            }
            if tour.points.is_empty() {
                continue;
            }
            tour_starts.push(points.len());
            points.extend_from_slice(&tour.points);
            colors.extend_from_slice(&tour.colors);
        }

        Self::new(points, colors, tour_starts)
    }

    /// Returns the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Checks whether there is no point at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns all the points.
    pub fn points(&self) -> &Arc<[GeoPoint]> {
        &self.points
    }

    /// Returns the color of each point.
    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// Returns the index of the first point of each tour.
    pub fn tour_starts(&self) -> &[usize] {
        &self.tour_starts
    }

    /// Returns the number of tours.
    pub fn tour_count(&self) -> usize {
        if self.points.is_empty() {
            0
        } else if self.tour_starts.first() == Some(&0) {
            self.tour_starts.len()
        } else {
            self.tour_starts.len() + 1
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn points(n: usize) -> Vec<GeoPoint> {
        (0..n).map(|i| GeoPoint::new(0.0, i as f64)).collect()
    }

    #[test]
    fn accepts_valid_data() {
        let data = TrackData::new(points(5), vec![0u32; 5], vec![0usize, 3]).unwrap();
        assert_eq!(data.len(), 5);
        assert_eq!(data.tour_count(), 2);

        let data = TrackData::new(points(5), vec![0u32; 5], vec![2usize]).unwrap();
        assert_eq!(data.tour_count(), 2);

        let data = TrackData::new(points(5), vec![0u32; 5], Vec::<usize>::new()).unwrap();
        assert_eq!(data.tour_count(), 1);
    }

    #[test]
    fn empty_data() {
        let data = TrackData::new(points(0), Vec::<u32>::new(), Vec::<usize>::new()).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.tour_count(), 0);
        assert!(TrackData::default().is_empty());
    }

    #[test]
    fn rejects_color_mismatch() {
        assert_eq!(
            TrackData::new(points(3), vec![0u32; 2], vec![0usize]).unwrap_err(),
            InvalidTrackData::ColorCountMismatch {
                points: 3,
                colors: 2
            }
        );
    }

    #[test]
    fn rejects_out_of_range_tour_start() {
        assert_eq!(
            TrackData::new(points(3), vec![0u32; 3], vec![0usize, 3]).unwrap_err(),
            InvalidTrackData::TourStartOutOfRange {
                start: 3,
                points: 3
            }
        );
        assert!(TrackData::new(points(0), Vec::<u32>::new(), vec![0usize]).is_err());
    }

    #[test]
    fn rejects_unordered_tour_starts() {
        assert_eq!(
            TrackData::new(points(6), vec![0u32; 6], vec![0usize, 4, 2]).unwrap_err(),
            InvalidTrackData::TourStartsNotIncreasing {
                previous: 4,
                start: 2
            }
        );
        assert!(TrackData::new(points(6), vec![0u32; 6], vec![0usize, 2, 2]).is_err());
    }

    #[test]
    fn concatenates_tours() {
        let tours = [
            Tour::with_color(points(3), 0xFF00_00FF),
            Tour::default(),
            Tour::with_color(points(2), 0xFFFF_0000),
        ];
        let data = TrackData::from_tours(&tours).unwrap();
        assert_eq!(data.len(), 5);
        assert_eq!(data.tour_starts(), &[0, 3]);
        assert_eq!(data.colors()[3], 0xFFFF_0000);
    }
}
