//! Per-frame adapter between the host render loop and the worker.

use super::source::{TrackHandle, TrackSource};
use super::worker::{RedrawFn, RenderTask, Worker, WorkerStats, WorkerStatus};
use crate::config::TrackConfig;
use crate::error::InvalidTrackData;
use crate::geometry::projection::GeoPoint;
use crate::map::position::{MapPosition, RenderTransform, TileIndex};
use crate::render::buckets::RenderBuckets;
use crate::render::builder::BuildSettings;
use crate::track_data::TrackData;
use log::debug;
use std::io;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of the layer geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerState {
    /// No track was ever set.
    NoData,
    /// A track was set, no geometry was requested for it yet.
    PointsSet,
    /// The drawn geometry doesn't match the current track or tile.
    GeometryStale,
    /// The drawn geometry matches the current track and tile.
    GeometryFresh,
}

/// Layer drawing a set of tours on the map.
///
/// [`TourLayer::update()`] is meant to be called once per frame from the
/// render loop. It never blocks: geometry is computed by a background worker
/// and swapped in when ready.
pub struct TourLayer {
    source: Arc<TrackSource>,
    handle: TrackHandle,
    worker: Worker,
    /// Task currently drawn.
    active: RenderTask,
    config: TrackConfig,
    settings: BuildSettings,
    coalescing_delay: Duration,
    /// Position of the last frame.
    viewport: Option<MapPosition>,
    /// Tile of the last submitted computation.
    last_tile: Option<TileIndex>,
    state: LayerState,
    enabled: bool,
    redraw: RedrawFn,
}

impl TourLayer {
    /// Creates a layer without track. `redraw` is called whenever a new frame
    /// should be rendered.
    pub fn new(config: TrackConfig, redraw: RedrawFn) -> io::Result<Self> {
        let config = config.sanitized();
        let source = Arc::new(TrackSource::new());
        let worker = Worker::spawn(Arc::clone(&source), Arc::clone(&redraw))?;
        let handle = TrackHandle::new(Arc::clone(&source), worker.handle());

        Ok(Self {
            source,
            handle,
            worker,
            active: RenderTask::default(),
            settings: BuildSettings::from_config(&config),
            coalescing_delay: Duration::from_millis(config.coalescing_delay_ms),
            config,
            viewport: None,
            last_tile: None,
            state: LayerState::NoData,
            enabled: true,
            redraw,
        })
    }

    /// Returns a handle to replace the track from another thread.
    pub fn track_handle(&self) -> TrackHandle {
        self.handle.clone()
    }

    /// Validates and installs a new set of points.
    ///
    /// On error, nothing changes and the previous track stays displayed.
    pub fn set_points(
        &self,
        points: impl Into<Arc<[GeoPoint]>>,
        colors: impl Into<Arc<[u32]>>,
        tour_starts: impl Into<Arc<[usize]>>,
    ) -> Result<(), InvalidTrackData> {
        self.handle.set_points(points, colors, tour_starts)
    }

    /// Installs an already validated track.
    pub fn set_track(&self, data: TrackData) {
        self.handle.set_track(data);
    }

    /// Processes one frame at the given viewport position.
    pub fn update(&mut self, viewport: &MapPosition) {
        if !self.enabled {
            return;
        }
        self.viewport = Some(*viewport);

        let dirty = self.source.take_dirty();
        if dirty && self.state == LayerState::NoData {
            self.state = LayerState::PointsSet;
        }
        if self.state == LayerState::NoData {
            return;
        }

        let tile_changed = self.last_tile != Some(viewport.tile_index());
        if dirty || tile_changed {
            self.submit(viewport);
        }
        self.poll();
    }

    /// Applies a new configuration.
    ///
    /// If `vertices_affected` is false, only the style of the drawn geometry
    /// is updated. Otherwise the geometry is recomputed.
    pub fn on_config_changed(&mut self, config: TrackConfig, vertices_affected: bool) {
        let config = config.sanitized();
        self.settings = BuildSettings::from_config(&config);
        self.coalescing_delay = Duration::from_millis(config.coalescing_delay_ms);
        self.config = config;

        if vertices_affected {
            match self.viewport {
                Some(viewport) if self.state != LayerState::NoData => self.submit(&viewport),
                _ => debug!("No geometry to recompute"),
            }
        } else {
            self.active.buckets_mut().set_style(&self.settings.style);
            (self.redraw)();
        }
    }

    /// Enables or disables the layer. A disabled layer ignores frames.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.worker.cancel();
        }
        // Recompute on the next frame.
        self.last_tile = None;
        if self.state == LayerState::GeometryFresh {
            self.state = LayerState::GeometryStale;
        }
    }

    /// Checks whether the layer is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the current state of the geometry.
    pub fn state(&self) -> LayerState {
        match self.state {
            LayerState::NoData if self.source.is_dirty() => LayerState::PointsSet,
            LayerState::GeometryFresh if self.source.is_dirty() => LayerState::GeometryStale,
            state => state,
        }
    }

    /// Returns the buckets to draw.
    pub fn active_buckets(&self) -> &RenderBuckets {
        self.active.buckets()
    }

    /// Returns the map position the drawn buckets were computed for.
    pub fn active_position(&self) -> &MapPosition {
        self.active.position()
    }

    /// Returns the transformation placing the drawn buckets onto `viewport`.
    pub fn render_transform(&self, viewport: &MapPosition) -> RenderTransform {
        RenderTransform::between(self.active.position(), viewport)
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Returns the status of the background worker.
    pub fn worker_status(&self) -> WorkerStatus {
        self.worker.status()
    }

    /// Returns the activity counters of the background worker.
    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    fn submit(&mut self, viewport: &MapPosition) {
        self.last_tile = Some(viewport.tile_index());
        self.state = LayerState::GeometryStale;
        self.worker
            .submit(*viewport, self.settings.clone(), self.coalescing_delay);
    }

    fn poll(&mut self) {
        if let Some(mut task) = self.worker.poll() {
            debug!("Swapping in geometry computed at {:?}", task.position());
            task.buckets_mut().set_style(&self.settings.style);
            let previous = mem::replace(&mut self.active, task);
            self.worker.recycle(previous);
            self.state = LayerState::GeometryFresh;
        }
    }
}
