//! Tick observers and their registry.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use metronome_core::{HandlerId, Seconds};

/// What a handler learns about the tick it is being notified of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickInfo {
    /// Scheduler time after this tick's deferred calls ran.
    pub now: Seconds,
    /// Ticks run since the loop was created, including this one.
    pub tick: u64,
    /// Wall-clock time since the previous tick.
    pub measured_interval: Duration,
    /// Smoothed lateness: 0 when ticks arrive exactly on the interval,
    /// positive when they run late.
    pub cpu: f64,
}

/// An observer notified once per tick and once at loop exit.
///
/// Both methods default to doing nothing. Handlers that need to stop the
/// loop or schedule work capture a [`LoopHandle`](crate::LoopHandle).
pub trait Handler {
    /// Called after the tick's deferred calls have run.
    fn on_tick(&mut self, _info: &TickInfo) {}

    /// Called once when the loop exits.
    fn on_exit(&mut self) {}
}

/// Handlers in registration order.
///
/// Removal keeps the relative order of the remaining handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: IndexMap<HandlerId, Box<dyn Handler>>,
    next_id: u64,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler at the end of the notification order.
    pub fn add(&mut self, handler: Box<dyn Handler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(id, handler);
        id
    }

    /// Unregister a handler, handing it back. Unknown ids return `None`.
    pub fn remove(&mut self, id: HandlerId) -> Option<Box<dyn Handler>> {
        self.handlers.shift_remove(&id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: HandlerId) -> bool {
        self.handlers.contains_key(&id)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered ids in notification order.
    pub fn ids(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.handlers.keys().copied()
    }

    /// Notify every handler of a tick, in registration order.
    pub fn tick_all(&mut self, info: &TickInfo) {
        for handler in self.handlers.values_mut() {
            handler.on_tick(info);
        }
    }

    /// Notify every handler of loop exit, in registration order.
    pub fn exit_all(&mut self) {
        for handler in self.handlers.values_mut() {
            handler.on_exit();
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("ids", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
