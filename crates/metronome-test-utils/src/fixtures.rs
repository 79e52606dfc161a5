//! Reusable contexts, deferred calls, handlers, and host backends.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use metronome_core::Seconds;
use metronome_engine::{DriverHooks, Handler, LoopHandle, Pump, TickInfo};
use metronome_queue::Delivery;

// ── Deferred-call context ──────────────────────────────────────────

/// One recorded invocation of a deferred call.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub now: Seconds,
    pub payload: Vec<u8>,
}

/// Context that records every call made through [`record`] or
/// [`retry_until_ready`].
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<Call>,
    /// While false, [`retry_until_ready`] asks to be retried.
    pub ready: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler times of the recorded calls, in invocation order.
    pub fn times(&self) -> Vec<Seconds> {
        self.calls.iter().map(|c| c.now).collect()
    }

    /// First payload byte of each recorded call (0 for empty payloads).
    pub fn tags(&self) -> Vec<u8> {
        self.calls
            .iter()
            .map(|c| c.payload.first().copied().unwrap_or(0))
            .collect()
    }
}

/// Record the call and finish.
pub fn record(rec: &mut Recorder, now: Seconds, payload: &[u8]) -> Delivery {
    rec.calls.push(Call {
        now,
        payload: payload.to_vec(),
    });
    Delivery::Done
}

/// Record the call; ask to be retried until `rec.ready` is set.
pub fn retry_until_ready(rec: &mut Recorder, now: Seconds, payload: &[u8]) -> Delivery {
    rec.calls.push(Call {
        now,
        payload: payload.to_vec(),
    });
    if rec.ready {
        Delivery::Done
    } else {
        Delivery::Retry
    }
}

// ── Handlers ───────────────────────────────────────────────────────

/// Something a [`RecordingHandler`] saw.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerEvent {
    Tick { name: &'static str, tick: u64, now: Seconds },
    Exit { name: &'static str },
}

/// Shared, thread-safe event log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<HandlerEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HandlerEvent>> {
        self.events.lock().unwrap()
    }

    pub fn push(&self, event: HandlerEvent) {
        self.lock().push(event);
    }

    pub fn snapshot(&self) -> Vec<HandlerEvent> {
        self.lock().clone()
    }

    /// Handler names in notification order, ticks and exits alike.
    pub fn names(&self) -> Vec<&'static str> {
        self.lock()
            .iter()
            .map(|e| match e {
                HandlerEvent::Tick { name, .. } | HandlerEvent::Exit { name } => *name,
            })
            .collect()
    }

    pub fn exits(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, HandlerEvent::Exit { .. }))
            .count()
    }
}

/// Handler that appends every notification to an [`EventLog`].
pub struct RecordingHandler {
    name: &'static str,
    log: EventLog,
}

impl RecordingHandler {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

impl Handler for RecordingHandler {
    fn on_tick(&mut self, info: &TickInfo) {
        self.log.push(HandlerEvent::Tick {
            name: self.name,
            tick: info.tick,
            now: info.now,
        });
    }

    fn on_exit(&mut self) {
        self.log.push(HandlerEvent::Exit { name: self.name });
    }
}

/// Handler that stops its loop after a fixed number of ticks.
pub struct StopAfter<C> {
    remaining: u64,
    handle: LoopHandle<C>,
}

impl<C> StopAfter<C> {
    pub fn new(ticks: u64, handle: LoopHandle<C>) -> Self {
        Self {
            remaining: ticks,
            handle,
        }
    }
}

impl<C> Handler for StopAfter<C> {
    fn on_tick(&mut self, _info: &TickInfo) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.handle.stop();
        }
    }
}

// ── Host backend ───────────────────────────────────────────────────

/// A hook call observed by [`ScriptedHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostCall {
    Init,
    Attach(Duration),
    Enter(Duration),
    Stop,
}

/// Host backend that ticks the pump a fixed number of times per `enter`
/// (or until the loop stops) and records every hook call.
#[derive(Clone, Debug)]
pub struct ScriptedHost {
    ticks_per_enter: u64,
    calls: Arc<Mutex<Vec<HostCall>>>,
}

impl ScriptedHost {
    pub fn new(ticks_per_enter: u64) -> Self {
        Self {
            ticks_per_enter,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    fn note(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DriverHooks for ScriptedHost {
    fn init(&mut self) {
        self.note(HostCall::Init);
    }

    fn attach(&mut self, interval: Duration) {
        self.note(HostCall::Attach(interval));
    }

    fn enter(&mut self, interval: Duration, pump: &mut dyn Pump) {
        self.note(HostCall::Enter(interval));
        for _ in 0..self.ticks_per_enter {
            if !pump.is_running() {
                break;
            }
            pump.tick();
        }
    }

    fn stop(&mut self) {
        self.note(HostCall::Stop);
    }
}
