//! Test utilities and fixtures for Metronome development.
//!
//! - [`ManualClock`]: a wall clock that only moves when told to, so tick
//!   timing is deterministic.
//! - [`fixtures`]: a recording context with matching deferred calls,
//!   recording and self-stopping handlers, and a scripted host backend.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metronome_core::Clock;

pub use fixtures::{
    record, retry_until_ready, Call, EventLog, HandlerEvent, HostCall, Recorder,
    RecordingHandler, ScriptedHost, StopAfter,
};

/// Clock advanced explicitly by the test.
///
/// Clones share the same reading, so a test can keep one clone and move
/// another into a [`MainLoop`](metronome_engine::MainLoop).
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(to.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
