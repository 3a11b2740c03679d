//! Computation of the line geometry of a track for one map position.

use super::buckets::{LineBucket, RenderBuckets};
use super::style::LineStyle;
use crate::config::TrackConfig;
use crate::error::WorkerCancelled;
use crate::geometry::clipper::{ClipResult, LineClipper};
use crate::geometry::projection::{project, GeoPoint};
use crate::geometry::Point;
use crate::layer::cancel::CancellationToken;
use crate::map::position::MapPosition;
use crate::track_data::TrackData;
use log::trace;
use std::sync::Arc;

/// Number of points processed between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Largest Mercator X step between two consecutive points that doesn't cross
/// the antimeridian.
const MAX_X_STEP: f64 = 0.5;

/// Tuning of the geometry computation.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildSettings {
    /// Minimum distance between two vertices of a line, in pixels.
    pub min_distance: f32,
    /// Minimum distance between two direction arrows, in pixels.
    pub arrow_min_distance: f32,
    /// Whether direction arrows are produced.
    pub show_direction_arrows: bool,
    /// Half-size of the clip region around the map center, in pixels.
    pub clip_extent: f32,
    /// Style given to the line bucket.
    pub style: LineStyle,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self::from_config(&TrackConfig::default())
    }
}

impl BuildSettings {
    /// Extracts the build settings from a track configuration.
    pub fn from_config(config: &TrackConfig) -> Self {
        let config = config.clone().sanitized();
        Self {
            min_distance: config.min_distance,
            arrow_min_distance: config.arrow_min_distance,
            show_direction_arrows: config.show_direction_arrows,
            clip_extent: config.clip_extent,
            style: LineStyle::from_config(&config),
        }
    }
}

/// Summary of one geometry computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of input points.
    pub points: usize,
    /// Number of vertices emitted.
    pub vertices: usize,
    /// Number of lines emitted.
    pub lines: usize,
    /// Number of direction arrows emitted.
    pub arrows: usize,
}

/// Line being accumulated, before it is appended to the bucket.
#[derive(Debug, Default)]
struct Run {
    points: Vec<Point<f32>>,
    colors: Vec<u32>,
    /// Last point dropped by decimation, drawn when the run ends.
    tail: Option<(Point<f32>, u32)>,
}

impl Run {
    fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn last(&self) -> Option<&Point<f32>> {
        self.points.last()
    }

    fn start(&mut self, point: Point<f32>, color: u32) {
        self.clear();
        self.push(point, color);
    }

    fn push(&mut self, point: Point<f32>, color: u32) {
        self.tail = None;
        self.points.push(point);
        self.colors.push(color);
    }

    fn commit_tail(&mut self) {
        if let Some((point, color)) = self.tail.take() {
            self.points.push(point);
            self.colors.push(color);
        }
    }

    fn flush(&mut self, bucket: &mut LineBucket) {
        self.commit_tail();
        bucket.add_line(&self.points, &self.colors);
        self.clear();
    }

    fn clear(&mut self) {
        self.points.clear();
        self.colors.clear();
        self.tail = None;
    }
}

/// Pixel position of a point relative to the map center, folded onto the copy
/// of the world closest to the center.
#[derive(Clone, Copy, Debug)]
struct Pixel {
    point: Point<f32>,
    /// -1 if the point was moved one world to the West, +1 to the East.
    flip: i8,
}

/// Converts tracks into clipped, decimated line geometry.
///
/// The builder keeps the Mercator projection of the last track it saw, so
/// that moving the map only recomputes pixel positions.
#[derive(Debug, Default)]
pub struct TrackGeometryBuilder {
    /// Cached Mercator projection of `projected_from`.
    projected: Vec<Point<f64>>,
    /// Points the cache was computed from.
    projected_from: Option<Arc<[GeoPoint]>>,
    /// Number of times the cache was recomputed.
    reprojections: usize,
    run: Run,
    arrows: Vec<Point<f32>>,
}

impl TrackGeometryBuilder {
    /// Creates a builder with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times the track was projected.
    pub fn reprojection_count(&self) -> usize {
        self.reprojections
    }

    /// Fills `buckets` with the geometry of `track` seen from `position`.
    ///
    /// On cancellation the content of `buckets` is unspecified and must be
    /// discarded.
    pub(crate) fn build(
        &mut self,
        track: &TrackData,
        position: &MapPosition,
        settings: &BuildSettings,
        buckets: &mut RenderBuckets,
        cancel: &CancellationToken,
    ) -> Result<BuildStats, WorkerCancelled> {
        if track.is_empty() {
            buckets.clear();
            return Ok(BuildStats::default());
        }

        self.update_projection(track, cancel)?;

        let bucket = buckets.line_bucket_mut();
        bucket.reset();
        bucket.style.clone_from(&settings.style);

        let colors = track.colors();
        let world = position.world_pixels();
        let to_pixel = |p: &Point<f64>| -> Pixel {
            let mut x = ((p.x - position.x) * world).trunc();
            let y = ((p.y - position.y) * world).trunc();
            let mut flip = 0;
            if x > world / 2.0 {
                x -= world;
                flip = -1;
            } else if x < -world / 2.0 {
                x += world;
                flip = 1;
            }
            Pixel {
                point: Point::new(x as f32, y as f32),
                flip,
            }
        };

        let mut clipper = LineClipper::centered(settings.clip_extent);
        let run = &mut self.run;
        let arrows = &mut self.arrows;
        run.clear();
        arrows.clear();

        let first = to_pixel(&self.projected[0]);
        clipper.clip_start(first.point.x, first.point.y);
        if clipper.is_inside() {
            run.start(first.point, colors[0]);
            arrows.push(first.point);
        }
        let mut flip = first.flip;
        let mut prev_x = self.projected[0].x;
        let mut last_arrow = first.point;

        let mut tour_starts = track.tour_starts().iter().copied().skip_while(|&s| s == 0);
        let mut next_tour_start = tour_starts.next();

        for (i, projected) in self.projected.iter().enumerate().skip(1) {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(WorkerCancelled);
            }

            let pixel = to_pixel(projected);
            let p = pixel.point;
            let color = colors[i];

            let new_tour = next_tour_start == Some(i);
            if new_tour {
                next_tour_start = tour_starts.next();
            }
            let wraps = (projected.x - prev_x).abs() > MAX_X_STEP;
            prev_x = projected.x;
            if pixel.flip != flip || wraps || new_tour {
                flip = pixel.flip;
                run.flush(bucket);
                clipper.clip_start(p.x, p.y);
                if clipper.is_inside() {
                    run.start(p, color);
                }
                continue;
            }

            let was_inside = clipper.is_inside();
            match clipper.clip_next(p.x, p.y) {
                ClipResult::Outside => run.flush(bucket),
                ClipResult::Intersection => {
                    let (a, b) = clipper.line();
                    if was_inside && !run.is_empty() {
                        run.commit_tail();
                    } else {
                        run.flush(bucket);
                        // Touching a corner of the region.
                        if a == b && !clipper.is_inside() {
                            continue;
                        }
                        run.start(a, color);
                    }
                    run.push(b, color);
                    if !clipper.is_inside() {
                        run.flush(bucket);
                    }
                }
                ClipResult::Inside => {
                    let far_enough = run
                        .last()
                        .is_none_or(|last| last.further_than(&p, settings.min_distance));
                    if far_enough {
                        run.push(p, color);
                    } else {
                        run.tail = Some((p, color));
                    }
                    if last_arrow.further_than(&p, settings.arrow_min_distance) {
                        last_arrow = p;
                        arrows.push(p);
                    }
                }
            }
        }
        run.flush(bucket);

        if settings.show_direction_arrows {
            bucket.set_direction_arrows(arrows);
        }

        let stats = BuildStats {
            points: track.len(),
            vertices: bucket.vertex_count(),
            lines: bucket.line_count(),
            arrows: bucket.direction_arrows().len(),
        };
        trace!("Built track geometry at {position:?}: {stats:?}");
        Ok(stats)
    }

    /// Projects the track points, unless they are already cached.
    fn update_projection(
        &mut self,
        track: &TrackData,
        cancel: &CancellationToken,
    ) -> Result<(), WorkerCancelled> {
        let points = track.points();
        if let Some(cached) = &self.projected_from {
            if Arc::ptr_eq(cached, points) && cached.len() == points.len() {
                return Ok(());
            }
        }

        self.projected_from = None;
        self.projected.clear();
        self.projected.reserve(points.len());
        for chunk in points.chunks(CANCEL_CHECK_INTERVAL) {
            if cancel.is_cancelled() {
                return Err(WorkerCancelled);
            }
            self.projected.extend(chunk.iter().map(project));
        }

        self.projected_from = Some(Arc::clone(points));
        self.reprojections += 1;
        trace!("Projected {} track points", points.len());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::projection::unproject;

    const ZOOM: u8 = 10;

    fn track(points: &[(f64, f64)], tour_starts: Vec<usize>) -> TrackData {
        let points: Vec<GeoPoint> = points
            .iter()
            .map(|&(lat, lon)| GeoPoint::new(lat, lon))
            .collect();
        let colors: Vec<u32> = (0..points.len() as u32).collect();
        TrackData::new(points, colors, tour_starts).unwrap()
    }

    fn build_with(
        track: &TrackData,
        position: &MapPosition,
        settings: &BuildSettings,
    ) -> (RenderBuckets, BuildStats) {
        let mut builder = TrackGeometryBuilder::new();
        let mut buckets = RenderBuckets::default();
        let stats = builder
            .build(
                track,
                position,
                settings,
                &mut buckets,
                &CancellationToken::new(),
            )
            .unwrap();
        (buckets, stats)
    }

    fn build(track: &TrackData, center: (f64, f64)) -> (RenderBuckets, BuildStats) {
        let position = MapPosition::from_geo(&GeoPoint::new(center.0, center.1), ZOOM);
        build_with(track, &position, &BuildSettings::default())
    }

    fn lines(buckets: &RenderBuckets) -> Vec<Vec<Point<f32>>> {
        buckets
            .line_bucket()
            .unwrap()
            .lines()
            .map(|line| line.points.to_vec())
            .collect()
    }

    /// Returns a point whose pixel position at `ZOOM`, relative to the
    /// origin, is `(x, y)`.
    fn at_pixel(x: f64, y: f64) -> (f64, f64) {
        let world = MapPosition::new(0.5, 0.5, ZOOM).world_pixels();
        // Half a pixel away from the origin, so that truncation lands on (x, y).
        let nudge = |v: f64| if v < 0.0 { v - 0.5 } else { v + 0.5 };
        let geo = unproject(Point::new(0.5 + nudge(x) / world, 0.5 + nudge(y) / world));
        (geo.latitude, geo.longitude)
    }

    #[test]
    fn close_points_at_origin() {
        let data = track(&[(0.0, 0.0), (0.0, 0.0001), (0.0, 0.0002)], vec![]);
        let (buckets, stats) = build(&data, (0.0, 0.0));
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.vertices, 2);
        assert_eq!(
            buckets.line_bucket().unwrap().lines().next().unwrap().colors,
            &[0, 2]
        );
    }

    #[test]
    fn close_points_keep_first_and_last() {
        let data = track(&[(46.0, 7.0), (46.0, 7.0001), (46.0, 7.0002)], vec![0]);
        let (buckets, stats) = build(&data, (46.0, 7.0));
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.vertices, 2);

        let bucket = buckets.line_bucket().unwrap();
        let line = bucket.lines().next().unwrap();
        assert_eq!(line.colors, &[0, 2]);
    }

    #[test]
    fn no_points_clears_buckets() {
        let mut buckets = RenderBuckets::default();
        buckets
            .line_bucket_mut()
            .add_line(&[Point::new(0.0, 0.0), Point::new(9.0, 9.0)], &[1, 2]);

        let mut builder = TrackGeometryBuilder::new();
        let stats = builder
            .build(
                &TrackData::default(),
                &MapPosition::new(0.5, 0.5, ZOOM),
                &BuildSettings::default(),
                &mut buckets,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(stats, BuildStats::default());
        assert!(buckets.is_empty());
    }

    #[test]
    fn single_point_has_no_line() {
        let data = track(&[(0.0, 0.0)], vec![]);
        let (buckets, stats) = build(&data, (0.0, 0.0));
        assert_eq!(stats.lines, 0);
        assert_eq!(buckets.line_bucket().unwrap().vertex_count(), 0);
    }

    #[test]
    fn tours_are_separate_lines() {
        let data = track(
            &[
                (46.0, 7.0),
                (46.0, 7.01),
                (46.0, 7.02),
                (46.01, 7.0),
                (46.01, 7.01),
                (46.01, 7.02),
            ],
            vec![0, 3],
        );
        let (buckets, stats) = build(&data, (46.0, 7.01));
        assert_eq!(stats.lines, 2);

        let bucket = buckets.line_bucket().unwrap();
        let runs: Vec<_> = bucket.lines().collect();
        assert_eq!(runs[0].colors, &[0, 1, 2]);
        assert_eq!(runs[1].colors, &[3, 4, 5]);
    }

    #[test]
    fn antimeridian_splits_line() {
        let data = track(
            &[(0.0, 179.8), (0.0, 179.9), (0.0, -179.9), (0.0, -179.8)],
            vec![],
        );
        let (buckets, stats) = build(&data, (0.0, 179.95));
        assert_eq!(stats.lines, 2);

        let runs = lines(&buckets);
        assert!(runs[0].iter().all(|p| p.x < 0.0));
        assert!(runs[1].iter().all(|p| p.x > 0.0));
        // No vertex jumps across the world.
        for run in &runs {
            for pair in run.windows(2) {
                assert!((pair[0].x - pair[1].x).abs() < 1000.0);
            }
        }
    }

    #[test]
    fn antimeridian_splits_line_away_from_viewport() {
        let data = track(&[(0.0, 179.9), (0.0, -179.9)], vec![]);

        // The whole world is visible.
        let position = MapPosition::new(0.5, 0.5, 1);
        let (_, stats) = build_with(&data, &position, &BuildSettings::default());
        assert_eq!(stats.lines, 0);

        let (_, stats) = build(&data, (0.0, 0.0));
        assert_eq!(stats.lines, 0);
        assert_eq!(stats.vertices, 0);
    }

    #[test]
    fn antimeridian_keeps_both_halves_at_low_zoom() {
        let data = track(
            &[(0.0, 179.8), (0.0, 179.9), (0.0, -179.9), (0.0, -179.8)],
            vec![],
        );
        let position = MapPosition::new(0.5, 0.5, 1);
        let (buckets, stats) = build_with(&data, &position, &BuildSettings::default());
        assert_eq!(stats.lines, 2);

        let runs = lines(&buckets);
        assert!(runs[0].iter().all(|p| p.x > 0.0));
        assert!(runs[1].iter().all(|p| p.x < 0.0));
    }

    #[test]
    fn segment_outside_corner_is_dropped() {
        let data = track(&[at_pixel(2600.0, -1900.0), at_pixel(1900.0, -2600.0)], vec![]);
        let (_, stats) = build(&data, (0.0, 0.0));
        assert_eq!(stats.lines, 0);
        assert_eq!(stats.vertices, 0);
    }

    #[test]
    fn segment_touching_corner_is_dropped() {
        let data = track(&[at_pixel(2148.0, -1948.0), at_pixel(1948.0, -2148.0)], vec![]);
        let (_, stats) = build(&data, (0.0, 0.0));
        assert_eq!(stats.lines, 0);
    }

    #[test]
    fn track_outside_region_is_dropped() {
        let data = track(&[(0.0, 7.0), (0.0, 7.1), (0.1, 7.2)], vec![]);
        let (_, stats) = build(&data, (0.0, 0.0));
        assert_eq!(stats.vertices, 0);
        assert_eq!(stats.lines, 0);
    }

    #[test]
    fn track_inside_region_is_kept() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (0.0, i as f64 * 0.1)).collect();
        let data = track(&points, vec![]);
        let (_, stats) = build(&data, (0.0, 0.5));
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.vertices, 10);
    }

    #[test]
    fn leaving_region_adds_boundary_vertex() {
        let data = track(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)], vec![]);
        let (buckets, _) = build(&data, (0.0, 0.0));
        let runs = lines(&buckets);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 4);
        assert_eq!(runs[0][3], Point::new(2048.0, 0.0));
    }

    #[test]
    fn entering_region_starts_at_boundary() {
        let data = track(&[(0.0, 3.0), (0.0, 2.0), (0.0, 1.0), (0.0, 0.0)], vec![]);
        let (buckets, _) = build(&data, (0.0, 0.0));
        let runs = lines(&buckets);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 4);
        assert_eq!(runs[0][0], Point::new(2048.0, 0.0));
        assert_eq!(runs[0][3], Point::new(0.0, 0.0));
    }

    #[test]
    fn crossing_region_keeps_clipped_segment() {
        let data = track(&[(0.0, -4.0), (0.0, 4.0)], vec![]);
        let (buckets, _) = build(&data, (0.0, 0.0));
        let runs = lines(&buckets);
        assert_eq!(runs, vec![vec![Point::new(-2048.0, 0.0), Point::new(2048.0, 0.0)]]);
    }

    #[test]
    fn decimation_keeps_distance() {
        let points: Vec<(f64, f64)> = (0..500).map(|i| (0.0, i as f64 * 0.001)).collect();
        let data = track(&points, vec![]);
        let settings = BuildSettings::default();
        let (buckets, stats) = build(&data, (0.0, 0.25));
        assert!(stats.vertices < 500);

        let runs = lines(&buckets);
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        // All but the final pending point are spaced by the minimum distance.
        for pair in run[..run.len() - 1].windows(2) {
            assert!(pair[0].further_than(&pair[1], settings.min_distance));
        }
        let colors = buckets.line_bucket().unwrap().lines().next().unwrap().colors;
        assert_eq!(colors.last(), Some(&499));
    }

    #[test]
    fn direction_arrows_are_spaced() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (0.0, i as f64 * 0.1)).collect();
        let data = track(&points, vec![]);
        let position = MapPosition::from_geo(&GeoPoint::new(0.0, 0.3), ZOOM);

        let settings = BuildSettings {
            show_direction_arrows: true,
            ..BuildSettings::default()
        };
        let (buckets, stats) = build_with(&data, &position, &settings);
        assert_eq!(stats.arrows, 10);
        assert_eq!(buckets.line_bucket().unwrap().direction_arrows().len(), 10);

        let settings = BuildSettings {
            show_direction_arrows: true,
            arrow_min_distance: 100.0,
            ..BuildSettings::default()
        };
        let (_, stats) = build_with(&data, &position, &settings);
        assert_eq!(stats.arrows, 5);

        let (_, stats) = build_with(&data, &position, &BuildSettings::default());
        assert_eq!(stats.arrows, 0);
    }

    #[test]
    fn projection_is_cached() {
        let data = track(&[(0.0, 0.0), (0.0, 1.0)], vec![]);
        let mut builder = TrackGeometryBuilder::new();
        let mut buckets = RenderBuckets::default();
        let token = CancellationToken::new();
        let settings = BuildSettings::default();

        for zoom in [8, 9, 10] {
            let position = MapPosition::new(0.5, 0.5, zoom);
            builder
                .build(&data.clone(), &position, &settings, &mut buckets, &token)
                .unwrap();
        }
        assert_eq!(builder.reprojection_count(), 1);

        let other = track(&[(0.0, 0.0), (0.0, 1.0)], vec![]);
        let position = MapPosition::new(0.5, 0.5, ZOOM);
        builder
            .build(&other, &position, &settings, &mut buckets, &token)
            .unwrap();
        assert_eq!(builder.reprojection_count(), 2);
    }

    #[test]
    fn cancelled_build_fails() {
        let points: Vec<(f64, f64)> = (0..5000).map(|i| (0.0, i as f64 * 1e-4)).collect();
        let data = track(&points, vec![]);
        let token = CancellationToken::new();
        token.cancel();

        let mut builder = TrackGeometryBuilder::new();
        let result = builder.build(
            &data,
            &MapPosition::new(0.5, 0.5, ZOOM),
            &BuildSettings::default(),
            &mut RenderBuckets::default(),
            &token,
        );
        assert_eq!(result, Err(WorkerCancelled));
        // A cancelled projection is not cached.
        assert_eq!(builder.reprojection_count(), 0);
    }
}
