//! Cross-thread access to a main loop.
//!
//! The loop itself is single-threaded. A [`LoopHandle`] is the only way in
//! from another thread (or from inside a handler): it can request a stop
//! through an atomic flag, and post deferred calls through a bounded
//! crossbeam channel. The loop drains the channel at the start of every
//! tick, before running due calls, so a post becomes visible to the queue
//! on the next tick.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use metronome_core::{Identity, PostError, ScheduleError, Seconds};
use metronome_queue::{DeferredQueue, MsgFn, Payload};
use tracing::warn;

/// A deferred call travelling from a [`LoopHandle`] to the loop thread.
pub(crate) struct Posted<C> {
    at: Seconds,
    func: MsgFn<C>,
    identity: Identity,
    payload: Payload,
}

/// Outcome of moving the inbox into the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DrainStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Loop-side end of the inbox.
pub(crate) struct Inbox<C> {
    tx: Sender<Posted<C>>,
    rx: Receiver<Posted<C>>,
    capacity: usize,
}

impl<C> Inbox<C> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn sender(&self) -> Sender<Posted<C>> {
        self.tx.clone()
    }

    /// Move posted calls into `queue`.
    ///
    /// At most one inbox-capacity worth of posts is taken per call, so a
    /// producer posting continuously cannot keep the loop thread here.
    pub fn drain_into(&self, queue: &mut DeferredQueue<C>) -> DrainStats {
        let mut stats = DrainStats::default();
        for posted in self.rx.try_iter().take(self.capacity) {
            match queue.schedule_payload(posted.at, posted.func, posted.identity, posted.payload) {
                Ok(()) => stats.accepted += 1,
                Err(err) => {
                    stats.rejected += 1;
                    match err {
                        ScheduleError::CapacityExceeded { capacity } => {
                            warn!(at = posted.at, capacity, "posted call dropped: queue full");
                        }
                        ScheduleError::InvalidTime { at } => {
                            warn!(at, "posted call dropped: invalid time");
                        }
                    }
                }
            }
        }
        stats
    }
}

/// Cloneable, sendable handle to a [`MainLoop`](crate::MainLoop).
///
/// Obtained from [`MainLoop::handle`](crate::MainLoop::handle). Outlives
/// the loop safely: once the loop is dropped, [`post`](Self::post) fails
/// with [`PostError::Shutdown`].
pub struct LoopHandle<C> {
    running: Arc<AtomicBool>,
    tx: Sender<Posted<C>>,
}

impl<C> LoopHandle<C> {
    pub(crate) fn new(running: Arc<AtomicBool>, tx: Sender<Posted<C>>) -> Self {
        Self { running, tx }
    }

    /// Ask the loop to stop.
    ///
    /// The sleep backend notices before its next tick; a host backend
    /// notices through [`Pump::is_running`](crate::Pump::is_running).
    /// Unlike [`MainLoop::stop`](crate::MainLoop::stop), this does not
    /// call the host's `stop` hook, since that must run on the loop thread.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Post a deferred call to run at scheduler time `at`.
    ///
    /// The call enters the queue at the start of the loop's next tick. If
    /// the queue is full at that point the call is dropped, counted in
    /// [`TickMetrics::inbox_rejections`](crate::TickMetrics::inbox_rejections)
    /// and logged.
    pub fn post(
        &self,
        at: Seconds,
        func: MsgFn<C>,
        identity: Identity,
        payload: &[u8],
    ) -> Result<(), PostError> {
        let posted = Posted {
            at,
            func,
            identity,
            payload: Payload::copy_from(payload),
        };
        self.tx.try_send(posted).map_err(|err| match err {
            TrySendError::Full(_) => PostError::InboxFull,
            TrySendError::Disconnected(_) => PostError::Shutdown,
        })
    }
}

impl<C> Clone for LoopHandle<C> {
    fn clone(&self) -> Self {
        Self {
            running: Arc::clone(&self.running),
            tx: self.tx.clone(),
        }
    }
}

impl<C> fmt::Debug for LoopHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopHandle")
            .field("running", &self.is_running())
            .field("queued", &self.tx.len())
            .finish()
    }
}
