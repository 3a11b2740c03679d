//! Background thread computing the track geometry, with double buffering.

use super::cancel::CancellationToken;
use super::source::TrackSource;
use crate::error::WorkerCancelled;
use crate::map::position::MapPosition;
use crate::render::buckets::RenderBuckets;
use crate::render::builder::{BuildSettings, TrackGeometryBuilder};
use log::{debug, info, warn};
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Callback asking the host to render a new frame.
pub type RedrawFn = Arc<dyn Fn() + Send + Sync>;

/// Geometry computed for one map position.
///
/// Exactly two tasks exist per layer: one drawn by the render loop, one owned
/// by the worker. They are moved between both sides, never shared.
#[derive(Clone, Debug, Default)]
pub struct RenderTask {
    buckets: RenderBuckets,
    position: MapPosition,
    /// Revision of the track the buckets were computed from.
    revision: u64,
}

impl RenderTask {
    /// Returns the computed buckets.
    pub fn buckets(&self) -> &RenderBuckets {
        &self.buckets
    }

    pub(crate) fn buckets_mut(&mut self) -> &mut RenderBuckets {
        &mut self.buckets
    }

    /// Returns the map position the buckets were computed for.
    pub fn position(&self) -> &MapPosition {
        &self.position
    }

    /// Returns the revision of the track the buckets were computed from.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Observable state of the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Nothing to do.
    Idle,
    /// A computation is waiting to start.
    Queued,
    /// A computation is in progress.
    Running,
    /// A computed task waits to be polled.
    Done,
}

/// Counters of the worker activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Number of requests submitted.
    pub submitted: u64,
    /// Number of tasks published.
    pub completed: u64,
    /// Number of computations aborted before completion.
    pub cancelled: u64,
    /// Number of computed tasks thrown away because they were outdated.
    pub discarded: u64,
}

/// Pending computation.
struct Request {
    position: MapPosition,
    settings: BuildSettings,
    not_before: Instant,
}

/// Computation picked up by the worker thread.
struct Job {
    request: Request,
    task: RenderTask,
    generation: u64,
    token: CancellationToken,
}

struct State {
    request: Option<Request>,
    running: bool,
    /// Incremented whenever in-flight work becomes outdated.
    generation: u64,
    /// Token of the current generation.
    token: CancellationToken,
    /// Buffer available for the next computation.
    spare: Option<RenderTask>,
    /// Published task, not yet polled.
    done: Option<RenderTask>,
    shutdown: bool,
    stats: WorkerStats,
}

struct Shared {
    state: Mutex<State>,
    condvar: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Makes in-flight work outdated.
    fn invalidate(state: &mut State) {
        state.token.cancel();
        state.token = CancellationToken::new();
        state.generation += 1;
        if let Some(task) = state.done.take() {
            debug!("Discarding unclaimed task at {:?}", task.position);
            state.stats.discarded += 1;
            state.spare = Some(task);
        }
    }

    fn cancel(&self) {
        let mut state = self.lock();
        if state.request.take().is_some() {
            debug!("Dropping queued request");
        }
        Self::invalidate(&mut state);
    }

    fn cancel_stale(&self, revision: u64) {
        let mut state = self.lock();
        if state.running {
            debug!("Cancelling computation on an outdated track");
            state.token.cancel();
        }
        let stale = state
            .done
            .as_ref()
            .is_some_and(|task| task.revision < revision);
        if stale {
            if let Some(task) = state.done.take() {
                debug!("Discarding task of outdated track revision {}", task.revision);
                state.stats.discarded += 1;
                state.spare = Some(task);
            }
        }
    }

    /// Waits for the next computation to start, or returns `None` on
    /// shutdown.
    fn next_job(&self) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return None;
            }
            let not_before = state.request.as_ref().map(|request| request.not_before);
            let delay = match not_before {
                Some(not_before) if state.spare.is_some() => {
                    not_before.saturating_duration_since(Instant::now())
                }
                _ => {
                    state = self.condvar.wait(state).unwrap();
                    continue;
                }
            };
            if !delay.is_zero() {
                state = self.condvar.wait_timeout(state, delay).unwrap().0;
                continue;
            }
            if let (Some(request), Some(task)) = (state.request.take(), state.spare.take()) {
                state.running = true;
                return Some(Job {
                    request,
                    task,
                    generation: state.generation,
                    token: state.token.clone(),
                });
            }
        }
    }
}

/// Cloneable handle to cancel the work of a [`Worker`] from any thread.
#[derive(Clone)]
pub struct WorkerHandle {
    shared: Arc<Shared>,
}

impl WorkerHandle {
    /// Cancels any queued, running or unclaimed computation.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Cancels computations on track revisions older than `revision`.
    pub fn cancel_stale(&self, revision: u64) {
        self.shared.cancel_stale(revision);
    }
}

/// Background thread turning requests into [`RenderTask`]s.
pub struct Worker {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns the worker thread, computing the geometry of the track held by
    /// `source`. `redraw` is called whenever a task is published.
    pub fn spawn(source: Arc<TrackSource>, redraw: RedrawFn) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                request: None,
                running: false,
                generation: 0,
                token: CancellationToken::new(),
                spare: Some(RenderTask::default()),
                done: None,
                shutdown: false,
                stats: WorkerStats::default(),
            }),
            condvar: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("tour-track-worker".to_owned())
            .spawn(move || worker_loop(&thread_shared, &source, &*redraw))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Requests the computation of the geometry at `position`, to start after
    /// `delay`.
    ///
    /// This supersedes any queued, running or unclaimed computation.
    pub fn submit(&self, position: MapPosition, settings: BuildSettings, delay: Duration) {
        let mut state = self.shared.lock();
        Shared::invalidate(&mut state);
        let request = Request {
            position,
            settings,
            not_before: Instant::now() + delay,
        };
        if state.request.replace(request).is_some() {
            debug!("Replacing queued request by {position:?}");
        } else {
            debug!("Queuing request at {position:?}");
        }
        state.stats.submitted += 1;
        drop(state);
        self.shared.condvar.notify_all();
    }

    /// Cancels any queued, running or unclaimed computation.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Returns the published task, if any. Never blocks on a computation.
    pub fn poll(&self) -> Option<RenderTask> {
        self.shared.lock().done.take()
    }

    /// Hands back a task no longer drawn, to be reused as the next buffer.
    pub fn recycle(&self, task: RenderTask) {
        self.shared.lock().spare = Some(task);
        self.shared.condvar.notify_all();
    }

    /// Returns the current status.
    pub fn status(&self) -> WorkerStatus {
        let state = self.shared.lock();
        if state.running {
            WorkerStatus::Running
        } else if state.done.is_some() {
            WorkerStatus::Done
        } else if state.request.is_some() {
            WorkerStatus::Queued
        } else {
            WorkerStatus::Idle
        }
    }

    /// Returns the activity counters.
    pub fn stats(&self) -> WorkerStats {
        self.shared.lock().stats
    }

    /// Returns a handle to cancel work from other threads.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            state.token.cancel();
        }
        self.shared.condvar.notify_all();

        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(()) => info!("End of tour track worker"),
                Err(e) => warn!("Tour track worker panicked: {e:?}"),
            }
        }
    }
}

fn worker_loop(shared: &Shared, source: &TrackSource, redraw: &(dyn Fn() + Send + Sync)) {
    let mut builder = TrackGeometryBuilder::new();

    while let Some(job) = shared.next_job() {
        let Job {
            request,
            mut task,
            generation,
            token,
        } = job;

        let (track, revision) = source.snapshot();
        task.position = request.position;
        task.revision = revision;

        let start = Instant::now();
        let result = builder.build(
            &track,
            &request.position,
            &request.settings,
            &mut task.buckets,
            &token,
        );

        let mut state = shared.lock();
        state.running = false;
        let current = !token.is_cancelled()
            && state.generation == generation
            && source.revision() == revision;

        match result {
            Ok(stats) if current => {
                debug!(
                    "Computed track geometry at {:?} in {:?}: {stats:?}",
                    request.position,
                    start.elapsed()
                );
                state.stats.completed += 1;
                state.done = Some(task);
                drop(state);
                redraw();
            }
            Ok(_) => {
                debug!("Discarding outdated geometry at {:?}", request.position);
                state.stats.discarded += 1;
                state.spare = Some(task);
            }
            Err(WorkerCancelled) => {
                debug!("Cancelled computation at {:?}", request.position);
                state.stats.cancelled += 1;
                state.spare = Some(task);
            }
        }
    }
}
