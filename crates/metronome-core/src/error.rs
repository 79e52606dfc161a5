//! Error types for the Metronome primitives.
//!
//! Grouped by operation: scheduling into the deferred queue, posting across
//! threads into a running main loop, and configuration validation. Partial
//! ring-buffer transfers are not errors and have no type here; they are
//! reported through byte counts.

use std::error::Error;
use std::fmt;

use crate::time::Seconds;

/// Errors from scheduling a deferred call.
#[derive(Clone, Debug, PartialEq)]
pub enum ScheduleError {
    /// Every slot of the message pool is in use. The pool never grows, so
    /// the caller must retry later or size the pool larger.
    CapacityExceeded {
        /// Total number of slots in the pool.
        capacity: usize,
    },
    /// The requested virtual time is NaN and cannot be ordered.
    InvalidTime {
        /// The rejected time.
        at: Seconds,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { capacity } => {
                write!(f, "message pool exhausted: all {capacity} slots in use")
            }
            Self::InvalidTime { at } => write!(f, "cannot schedule at time {at}"),
        }
    }
}

impl Error for ScheduleError {}

/// Errors posting a deferred call to a main loop from another thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostError {
    /// The inbox channel is full (back-pressure).
    InboxFull,
    /// The main loop has been dropped.
    Shutdown,
}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InboxFull => write!(f, "main loop inbox full"),
            Self::Shutdown => write!(f, "main loop has shut down"),
        }
    }
}

impl Error for PostError {}

/// Errors detected while validating queue or main-loop configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The message pool must hold at least one message.
    ZeroQueueCapacity,
    /// The message pool capacity does not fit a `u32` slot index.
    QueueCapacityOverflow {
        /// The configured capacity.
        value: usize,
    },
    /// The retry period must be finite and strictly positive.
    InvalidRetryPeriod {
        /// The invalid value.
        value: Seconds,
    },
    /// The CPU-load smoothing factor must be in `(0, 1]`.
    InvalidSmoothing {
        /// The invalid value.
        value: f64,
    },
    /// The cross-thread inbox must hold at least one posted call.
    ZeroInboxCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroQueueCapacity => write!(f, "queue capacity must be at least 1"),
            Self::QueueCapacityOverflow { value } => {
                write!(f, "queue capacity {value} exceeds u32::MAX")
            }
            Self::InvalidRetryPeriod { value } => {
                write!(f, "retry period must be finite and positive, got {value}")
            }
            Self::InvalidSmoothing { value } => {
                write!(f, "cpu smoothing must be in (0, 1], got {value}")
            }
            Self::ZeroInboxCapacity => write!(f, "inbox capacity must be at least 1"),
        }
    }
}

impl Error for ConfigError {}
