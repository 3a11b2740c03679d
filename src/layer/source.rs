//! Shared slot holding the track displayed by a layer.

use super::worker::WorkerHandle;
use crate::error::InvalidTrackData;
use crate::geometry::projection::GeoPoint;
use crate::track_data::TrackData;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Current track and its revision number.
#[derive(Debug, Default)]
struct TrackSlot {
    data: Arc<TrackData>,
    revision: u64,
}

/// Track shared between the threads replacing it and the worker reading it.
///
/// Critical sections only swap or clone an [`Arc`].
#[derive(Debug, Default)]
pub struct TrackSource {
    slot: Mutex<TrackSlot>,
    /// Whether the track changed since the layer last looked at it.
    dirty: AtomicBool,
}

impl TrackSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the track, returning its new revision.
    pub fn replace(&self, data: TrackData) -> u64 {
        let data = Arc::new(data);
        let revision = {
            let mut slot = self.slot.lock().unwrap();
            slot.data = data;
            slot.revision += 1;
            slot.revision
        };
        self.dirty.store(true, Ordering::Release);
        revision
    }

    /// Returns the current track and its revision.
    pub fn snapshot(&self) -> (Arc<TrackData>, u64) {
        let slot = self.slot.lock().unwrap();
        (Arc::clone(&slot.data), slot.revision)
    }

    /// Returns the revision of the current track.
    pub fn revision(&self) -> u64 {
        self.slot.lock().unwrap().revision
    }

    /// Checks whether the track changed since the last call to
    /// [`Self::take_dirty()`].
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clears the dirty flag, returning its previous value.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

/// Cloneable handle to replace the track of a layer from any thread.
#[derive(Clone)]
pub struct TrackHandle {
    source: Arc<TrackSource>,
    worker: WorkerHandle,
}

impl TrackHandle {
    pub(crate) fn new(source: Arc<TrackSource>, worker: WorkerHandle) -> Self {
        Self { source, worker }
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
        let data = TrackData::new(points, colors, tour_starts)?;
        self.set_track(data);
        Ok(())
    }

    /// Installs an already validated track.
    pub fn set_track(&self, data: TrackData) {
        let points = data.len();
        let revision = self.source.replace(data);
        debug!("New track with {points} points (revision {revision})");
        self.worker.cancel_stale(revision);
    }
}
