//! Virtual-time-ordered queue of deferred calls.
//!
//! [`DeferredQueue`] keeps pending calls in a singly-linked list sorted by
//! time. Insertion scans from the head and places a new call after every
//! call due at the same time or earlier, so calls sharing a time fire in
//! the order they were scheduled. Prepending and appending are O(1).
//!
//! The queue is single-threaded: `schedule`, `update`, `cancel`, and
//! `clear` must all run on the thread that owns it.

use std::fmt;

use metronome_core::{ConfigError, Identity, ScheduleError, Seconds};
use tracing::debug;

use crate::config::QueueConfig;
use crate::payload::Payload;
use crate::pool::{MessagePool, SlotId};

/// Signature of a deferred call.
///
/// Receives the context passed to [`DeferredQueue::update`], the scheduler
/// time at which it runs, and its payload bytes.
///
/// A call cannot reach the queue that is running it. Periodic work either
/// returns [`Delivery::Retry`] to run again one retry period later, or keeps
/// a poster in its context and schedules its successor through that. Under
/// a main loop the poster is `metronome_engine::LoopHandle`.
pub type MsgFn<C> = fn(&mut C, Seconds, &[u8]) -> Delivery;

/// What a deferred call reports back to the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The call is finished; its slot is recycled.
    Done,
    /// The call could not do its work yet. It keeps its slot and payload and
    /// runs again one retry period after the current scheduler time.
    Retry,
}

struct Message<C> {
    time: Seconds,
    func: MsgFn<C>,
    identity: Identity,
    payload: Payload,
}

/// Fixed-capacity queue of deferred calls ordered by virtual time.
///
/// `C` is the context type handed to every call when the queue is
/// updated. The main loop uses its own context; standalone users often
/// use `()`.
pub struct DeferredQueue<C = ()> {
    pool: MessagePool<Message<C>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
    now: Seconds,
    retry_period: Seconds,
}

impl<C> DeferredQueue<C> {
    /// Create a queue with room for `capacity` pending calls and the
    /// default retry period.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or does not fit in a `u32`. Use
    /// [`from_config`](Self::from_config) for a non-panicking constructor.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "DeferredQueue capacity must be at least 1");
        Self::build(capacity, QueueConfig::default().retry_period)
    }

    /// Create a queue from a validated configuration.
    pub fn from_config(config: &QueueConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config.capacity, config.retry_period))
    }

    fn build(capacity: usize, retry_period: Seconds) -> Self {
        Self {
            pool: MessagePool::new(capacity),
            head: None,
            tail: None,
            len: 0,
            now: 0.0,
            retry_period,
        }
    }

    /// Current scheduler time.
    ///
    /// Use this as the logical "now" inside and around deferred calls; it is
    /// exact, unlike a wall-clock reading.
    pub fn now(&self) -> Seconds {
        self.now
    }

    /// Number of pending calls.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no calls are pending.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of message slots.
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Number of calls that can still be scheduled.
    pub fn available(&self) -> usize {
        self.pool.available()
    }

    /// Delay applied to calls that return [`Delivery::Retry`].
    pub fn retry_period(&self) -> Seconds {
        self.retry_period
    }

    /// Time of the earliest pending call.
    pub fn next_due(&self) -> Option<Seconds> {
        self.head.map(|id| self.time_of(id))
    }

    /// Iterate over pending calls in firing order.
    pub fn pending(&self) -> Pending<'_, C> {
        Pending {
            queue: self,
            cursor: self.head,
        }
    }

    /// Schedule `func` to run at virtual time `at` with a copy of `payload`.
    ///
    /// Payloads up to [`INLINE_PAYLOAD_BYTES`](crate::INLINE_PAYLOAD_BYTES)
    /// are stored in the slot; larger ones are copied to the heap. A call
    /// due at the same time as already-pending calls runs after them.
    pub fn schedule(
        &mut self,
        at: Seconds,
        func: MsgFn<C>,
        identity: Identity,
        payload: &[u8],
    ) -> Result<(), ScheduleError> {
        self.check_schedulable(at)?;
        self.push(at, func, identity, Payload::copy_from(payload))
    }

    /// Schedule with an already-built payload.
    pub fn schedule_payload(
        &mut self,
        at: Seconds,
        func: MsgFn<C>,
        identity: Identity,
        payload: Payload,
    ) -> Result<(), ScheduleError> {
        self.check_schedulable(at)?;
        self.push(at, func, identity, payload)
    }

    fn check_schedulable(&self, at: Seconds) -> Result<(), ScheduleError> {
        if at.is_nan() {
            return Err(ScheduleError::InvalidTime { at });
        }
        if self.pool.is_exhausted() {
            debug!(
                at,
                capacity = self.capacity(),
                "deferred call rejected: message pool exhausted"
            );
            return Err(ScheduleError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    fn push(
        &mut self,
        at: Seconds,
        func: MsgFn<C>,
        identity: Identity,
        payload: Payload,
    ) -> Result<(), ScheduleError> {
        let message = Message {
            time: at,
            func,
            identity,
            payload,
        };
        let id = self
            .pool
            .alloc(message)
            .map_err(|_| ScheduleError::CapacityExceeded {
                capacity: self.pool.capacity(),
            })?;
        self.link(id, at);
        Ok(())
    }

    /// Run every call due at or before `until`, then advance the clock to
    /// `until`.
    ///
    /// Calls run in time order, ties in scheduling order. Each call sees
    /// `now()` equal to the later of the previous scheduler time and its own
    /// due time, and its slot is recycled before the next call is popped.
    /// The clock never moves backwards: an `until` earlier than `now()`
    /// runs nothing and leaves the clock where it is. A NaN `until` is
    /// ignored.
    ///
    /// A call that returns [`Delivery::Retry`] runs at most once per
    /// `update`: it is re-queued one retry period later only after every
    /// other due call has run, even if that time is still `<= until`.
    ///
    /// Returns the number of calls run.
    pub fn update(&mut self, until: Seconds, ctx: &mut C) -> usize {
        if until.is_nan() {
            return 0;
        }
        let mut fired = 0;
        // Retried slots are parked on their own chain until the loop ends.
        let mut retried: Option<(SlotId, SlotId)> = None;
        while let Some(head) = self.head {
            let Some(message) = self.pool.get(head) else {
                break;
            };
            if message.time > until {
                break;
            }
            let (time, func) = (message.time, message.func);
            self.unlink_head(head);
            self.now = self.now.max(time);

            let now = self.now;
            let delivery = self
                .pool
                .get(head)
                .map_or(Delivery::Done, |m| func(ctx, now, m.payload.as_bytes()));
            fired += 1;

            match delivery {
                Delivery::Done => {
                    self.pool.release(head);
                }
                Delivery::Retry => {
                    if let Some(m) = self.pool.get_mut(head) {
                        m.time = now + self.retry_period;
                    }
                    retried = match retried {
                        None => Some((head, head)),
                        Some((first, last)) => {
                            self.pool.set_next(last, Some(head));
                            Some((first, head))
                        }
                    };
                }
            }
        }

        let mut cursor = retried.map(|(first, _)| first);
        while let Some(id) = cursor {
            cursor = self.pool.next(id);
            let at = self.time_of(id);
            self.link(id, at);
        }

        self.now = self.now.max(until);
        fired
    }

    /// Run every call due within `period` of the current time.
    pub fn advance(&mut self, period: Seconds, ctx: &mut C) -> usize {
        self.update(self.now + period, ctx)
    }

    /// Remove every pending call whose function and identity both match.
    ///
    /// Functions are compared by address. Returns the number removed;
    /// cancelling something that is not pending is a no-op.
    pub fn cancel(&mut self, func: MsgFn<C>, identity: Identity) -> usize {
        let mut removed = 0;
        let mut prev: Option<SlotId> = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let next = self.pool.next(id);
            let matches = self
                .pool
                .get(id)
                .is_some_and(|m| same_fn(m.func, func) && m.identity == identity);
            if matches {
                match prev {
                    None => self.head = next,
                    Some(p) => self.pool.set_next(p, next),
                }
                if self.tail == Some(id) {
                    self.tail = prev;
                }
                self.pool.release(id);
                self.len -= 1;
                removed += 1;
            } else {
                prev = Some(id);
            }
            cursor = next;
        }
        removed
    }

    /// Drop every pending call without running it and reset the clock
    /// to zero.
    pub fn clear(&mut self) {
        let mut cursor = self.head.take();
        self.tail = None;
        while let Some(id) = cursor {
            cursor = self.pool.next(id);
            self.pool.release(id);
        }
        self.len = 0;
        self.now = 0.0;
    }

    fn time_of(&self, id: SlotId) -> Seconds {
        self.pool.get(id).map_or(Seconds::INFINITY, |m| m.time)
    }

    fn unlink_head(&mut self, head: SlotId) {
        self.head = self.pool.next(head);
        if self.head.is_none() {
            self.tail = None;
        }
        self.pool.set_next(head, None);
        self.len -= 1;
    }

    fn link(&mut self, id: SlotId, at: Seconds) {
        self.pool.set_next(id, None);
        self.len += 1;

        let (Some(head), Some(tail)) = (self.head, self.tail) else {
            self.head = Some(id);
            self.tail = Some(id);
            return;
        };

        if at < self.time_of(head) {
            self.pool.set_next(id, Some(head));
            self.head = Some(id);
            return;
        }

        if at >= self.time_of(tail) {
            self.pool.set_next(tail, Some(id));
            self.tail = Some(id);
            return;
        }

        // `<=` keeps calls sharing a time in scheduling order.
        let mut prev = head;
        let mut next = self.pool.next(head);
        while let Some(n) = next {
            if self.time_of(n) > at {
                break;
            }
            prev = n;
            next = self.pool.next(n);
        }
        self.pool.set_next(id, next);
        self.pool.set_next(prev, Some(id));
        if next.is_none() {
            self.tail = Some(id);
        }
    }
}

fn same_fn<C>(a: MsgFn<C>, b: MsgFn<C>) -> bool {
    a as usize == b as usize
}

impl<C> fmt::Debug for DeferredQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("now", &self.now)
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("next_due", &self.next_due())
            .finish()
    }
}

/// A pending call as seen through [`DeferredQueue::pending`].
#[derive(Clone, Copy, Debug)]
pub struct PendingCall<'a> {
    /// When the call is due.
    pub time: Seconds,
    /// The identity it was scheduled with.
    pub identity: Identity,
    /// Its payload bytes.
    pub payload: &'a [u8],
}

/// Iterator over pending calls in firing order.
pub struct Pending<'a, C> {
    queue: &'a DeferredQueue<C>,
    cursor: Option<SlotId>,
}

impl<'a, C> Iterator for Pending<'a, C> {
    type Item = PendingCall<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let message = self.queue.pool.get(id)?;
        self.cursor = self.queue.pool.next(id);
        Some(PendingCall {
            time: message.time,
            identity: message.identity,
            payload: message.payload.as_bytes(),
        })
    }
}
