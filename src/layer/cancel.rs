//! Cooperative cancellation of background computations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flag shared between the thread requesting a cancellation and the thread
/// running the computation, which polls it between iterations.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the cancellation of the computation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Checks whether the cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
