//! Virtual time and wall-clock sources.
//!
//! Virtual time is a plain [`Seconds`] value that the deferred queue
//! advances explicitly. Wall-clock time comes from a [`Clock`], which the
//! main loop samples once per tick. Tests substitute a manually advanced
//! clock so tick timing is deterministic.

use std::time::{Duration, Instant};

/// Virtual time in seconds.
///
/// Scheduler time starts at zero when the main loop is created and only
/// moves forward (except across an explicit queue `clear()`).
pub type Seconds = f64;

/// A monotonic wall-clock source.
///
/// `now()` returns the elapsed time since an arbitrary, fixed origin. Only
/// differences between two readings are meaningful.
pub trait Clock {
    /// Elapsed time since this clock's origin.
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`Instant`].
///
/// The origin is the moment the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
