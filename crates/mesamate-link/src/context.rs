//! Shutdown signal shared by the controller, the listener and the console.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of [`Context::pause`].
const PAUSE_SLICE: Duration = Duration::from_millis(10);

/// Set once when the application is stopping; never reset.
#[derive(Clone, Debug, Default)]
pub struct Context {
    stopping: Arc<AtomicBool>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Ask every holder to wind down.
    #[inline]
    pub fn cancel(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    /// Sleep for `duration`, waking early on cancellation. Returns `false`
    /// if the context was cancelled.
    pub fn pause(&self, duration: Duration) -> bool {
        let until = Instant::now() + duration;
        loop {
            if self.is_done() {
                return false;
            }
            let left = until.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return true;
            }
            thread::sleep(left.min(PAUSE_SLICE));
        }
    }
}
