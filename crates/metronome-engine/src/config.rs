//! Main-loop configuration and validation.

use std::time::Duration;

use metronome_core::ConfigError;
use metronome_queue::QueueConfig;

/// Shortest tick interval the loop accepts. Shorter requests are clamped.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for a [`MainLoop`](crate::MainLoop).
#[derive(Clone, Debug, PartialEq)]
pub struct LoopConfig {
    /// Target time between ticks. Default: 10 ms. Values below
    /// [`MIN_INTERVAL`] are clamped, not rejected.
    pub interval: Duration,
    /// Deferred queue sizing and retry period.
    pub queue: QueueConfig,
    /// Weight of the newest sample in the CPU load average, in `(0, 1]`.
    /// Default: 0.1.
    pub cpu_smoothing: f64,
    /// Capacity of the cross-thread inbox fed by
    /// [`LoopHandle::post`](crate::LoopHandle::post). Default: 256.
    pub inbox_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            queue: QueueConfig::default(),
            cpu_smoothing: 0.1,
            inbox_capacity: 256,
        }
    }
}

impl LoopConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.queue.validate()?;
        if !(self.cpu_smoothing > 0.0 && self.cpu_smoothing <= 1.0) {
            return Err(ConfigError::InvalidSmoothing {
                value: self.cpu_smoothing,
            });
        }
        if self.inbox_capacity == 0 {
            return Err(ConfigError::ZeroInboxCapacity);
        }
        Ok(())
    }
}
