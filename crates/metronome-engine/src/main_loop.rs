//! The main loop: clock sampling, queue advancement, and handler dispatch.
//!
//! [`MainLoop`] is an ordinary value; create as many as needed. Its state
//! machine is `Stopped → Running → Stopped`:
//!
//! - [`start`](MainLoop::start) runs the loop to completion on the calling
//!   thread (sleep backend) or inside the host's event loop (host
//!   backend), then calls [`exit`](MainLoop::exit).
//! - [`attach`](MainLoop::attach) marks the loop running without taking the
//!   thread; the caller (or the host's timer) calls
//!   [`tick`](MainLoop::tick).
//! - [`stop`](MainLoop::stop) or [`LoopHandle::stop`] ends either mode.
//!
//! # Tick order
//!
//! 1. Measure wall time since the previous tick and update the CPU average.
//! 2. Drain posts from [`LoopHandle`]s into the queue.
//! 3. Run deferred calls due at or before `realtime()`.
//! 4. Notify handlers in registration order.
//! 5. Record [`TickMetrics`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metronome_core::{
    Clock, ConfigError, HandlerId, Identity, MonotonicClock, ScheduleError, Seconds,
};
use metronome_queue::{DeferredQueue, MsgFn, QueueConfig};
use tracing::{debug, info, trace, warn};

use crate::config::{LoopConfig, MIN_INTERVAL};
use crate::driver::{Driver, Pump};
use crate::handler::{Handler, HandlerRegistry, TickInfo};
use crate::inbox::{Inbox, LoopHandle};
use crate::metrics::TickMetrics;

/// Everything a tick touches. Kept apart from the driver so a host backend
/// can borrow the driver and this at the same time.
struct LoopCore<C> {
    queue: DeferredQueue<C>,
    context: C,
    handlers: HandlerRegistry,
    clock: Box<dyn Clock>,
    t0: Duration,
    last_tick: Duration,
    interval: Duration,
    measured_interval: Duration,
    cpu: f64,
    smoothing: f64,
    running: Arc<AtomicBool>,
    inbox: Inbox<C>,
    metrics: TickMetrics,
    ticks: u64,
}

impl<C> LoopCore<C> {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn begin(&mut self) {
        self.last_tick = self.clock.now();
        self.running.store(true, Ordering::Release);
    }

    fn run_sleeping(&mut self) {
        while self.is_running() {
            thread::sleep(self.interval);
            if !self.is_running() {
                break;
            }
            self.tick();
        }
    }

    fn tick(&mut self) -> TickInfo {
        let start = self.clock.now();
        let measured = start.saturating_sub(self.last_tick);
        self.last_tick = start;
        self.measured_interval = measured;

        let lateness = measured.as_secs_f64() / self.interval.as_secs_f64() - 1.0;
        self.cpu += self.smoothing * (lateness - self.cpu);

        let drained = self.inbox.drain_into(&mut self.queue);
        let until = start.saturating_sub(self.t0).as_secs_f64();
        let fired = self.queue.update(until, &mut self.context);

        self.ticks += 1;
        let info = TickInfo {
            now: self.queue.now(),
            tick: self.ticks,
            measured_interval: measured,
            cpu: self.cpu,
        };
        self.handlers.tick_all(&info);

        let busy = self.clock.now().saturating_sub(start);
        self.metrics = TickMetrics {
            tick: self.ticks,
            measured_interval_us: measured.as_micros() as u64,
            busy_us: busy.as_micros() as u64,
            fired,
            drained: drained.accepted,
            inbox_rejections: self.metrics.inbox_rejections + drained.rejected as u64,
        };
        trace!(
            tick = self.ticks,
            now = info.now,
            fired,
            drained = drained.accepted,
            cpu = self.cpu,
            "tick"
        );
        info
    }
}

impl<C> Pump for LoopCore<C> {
    fn tick(&mut self) -> TickInfo {
        LoopCore::tick(self)
    }

    fn is_running(&self) -> bool {
        LoopCore::is_running(self)
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Periodic driver owning a deferred queue, a context, and tick handlers.
///
/// `C` is the context passed to every deferred call. Use `()` when calls
/// carry everything they need in their payload.
pub struct MainLoop<C = ()> {
    core: LoopCore<C>,
    driver: Driver,
    /// A host backend has been attached and not yet told to stop.
    host_attached: bool,
}

impl MainLoop<()> {
    /// A loop with the default configuration, the sleep backend, and no
    /// context.
    pub fn new() -> Self {
        Self::with_context(())
    }
}

impl Default for MainLoop<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> MainLoop<C> {
    /// A loop with the default configuration and the given context.
    pub fn with_context(context: C) -> Self {
        let config = LoopConfig::default();
        let queue = DeferredQueue::new(QueueConfig::default().capacity);
        Self::assemble(&config, queue, context)
    }

    /// A loop built from a validated configuration.
    pub fn with_config(config: LoopConfig, context: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let queue = DeferredQueue::from_config(&config.queue)?;
        Ok(Self::assemble(&config, queue, context))
    }

    fn assemble(config: &LoopConfig, queue: DeferredQueue<C>, context: C) -> Self {
        let clock: Box<dyn Clock> = Box::new(MonotonicClock::new());
        let t0 = clock.now();
        let mut main_loop = Self {
            core: LoopCore {
                queue,
                context,
                handlers: HandlerRegistry::new(),
                clock,
                t0,
                last_tick: t0,
                interval: MIN_INTERVAL,
                measured_interval: Duration::ZERO,
                cpu: 0.0,
                smoothing: config.cpu_smoothing,
                running: Arc::new(AtomicBool::new(false)),
                inbox: Inbox::new(config.inbox_capacity),
                metrics: TickMetrics::default(),
                ticks: 0,
            },
            driver: Driver::Sleep,
            host_attached: false,
        };
        main_loop.set_interval(config.interval);
        main_loop.core.measured_interval = main_loop.core.interval;
        main_loop
    }

    /// Replace the wall clock. Resets `t0` to the new clock's current
    /// reading.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        let t0 = clock.now();
        self.core.clock = Box::new(clock);
        self.core.t0 = t0;
        self.core.last_tick = t0;
        self
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Run the loop until stopped, then call [`exit`](Self::exit).
    ///
    /// With the sleep backend this blocks, sleeping one interval before
    /// each tick. With a host backend it calls the host's `enter` hook and
    /// returns when the host does. Does nothing if already running.
    pub fn start(&mut self) {
        if self.core.is_running() {
            return;
        }
        self.release_host();
        self.core.begin();
        info!(
            driver = self.driver.name(),
            interval_us = self.core.interval.as_micros() as u64,
            "main loop started"
        );
        match &mut self.driver {
            Driver::Sleep => self.core.run_sleeping(),
            Driver::Host(hooks) => {
                let interval = self.core.interval;
                hooks.enter(interval, &mut self.core);
            }
        }
        self.core.running.store(false, Ordering::Release);
        info!(ticks = self.core.ticks, "main loop finished");
        self.exit();
    }

    /// Mark the loop running without taking the thread.
    ///
    /// A host backend is asked to start its timer; otherwise the caller
    /// is expected to call [`tick`](Self::tick) itself. Does nothing if
    /// already running.
    pub fn attach(&mut self) {
        if self.core.is_running() {
            return;
        }
        self.release_host();
        self.core.begin();
        if let Driver::Host(hooks) = &mut self.driver {
            hooks.attach(self.core.interval);
            self.host_attached = true;
        }
        info!(driver = self.driver.name(), "main loop attached");
    }

    /// Stop the loop.
    ///
    /// An attached host's `stop` hook is called so it can cancel its timer,
    /// including when a [`LoopHandle`] already cleared the running flag.
    /// Otherwise does nothing if already stopped.
    pub fn stop(&mut self) {
        let was_running = self.core.running.swap(false, Ordering::AcqRel);
        let had_host = self.release_host();
        if was_running || had_host {
            info!(ticks = self.core.ticks, "main loop stopped");
        }
    }

    /// Run one tick now and return what handlers were told.
    ///
    /// Works whether or not the loop is running, which is what manual
    /// timer integrations rely on. If a [`LoopHandle`] stopped the loop
    /// while a host was attached, the host's `stop` hook runs after the
    /// tick.
    pub fn tick(&mut self) -> TickInfo {
        let info = self.core.tick();
        if self.host_attached && !self.core.is_running() && self.release_host() {
            debug!(tick = info.tick, "host released after handle stop");
        }
        info
    }

    /// Call the attached host's `stop` hook once. Returns whether it ran.
    fn release_host(&mut self) -> bool {
        if !std::mem::take(&mut self.host_attached) {
            return false;
        }
        if let Driver::Host(hooks) = &mut self.driver {
            hooks.stop();
        }
        true
    }

    /// Notify every handler that the loop is exiting.
    pub fn exit(&mut self) {
        self.core.handlers.exit_all();
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Install a backend. A host backend's `init` hook runs immediately.
    ///
    /// An attached host is stopped before it is dropped. If the loop is
    /// still running, a new host is attached in its place so ticks keep
    /// coming.
    pub fn set_driver(&mut self, mut driver: Driver) {
        self.release_host();
        if let Driver::Host(hooks) = &mut driver {
            hooks.init();
            if self.core.is_running() {
                hooks.attach(self.core.interval);
                self.host_attached = true;
            }
        }
        info!(from = self.driver.name(), to = driver.name(), "driver switched");
        self.driver = driver;
    }

    /// The installed backend.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// A cloneable handle for stopping and posting from anywhere.
    pub fn handle(&self) -> LoopHandle<C> {
        LoopHandle::new(Arc::clone(&self.core.running), self.core.inbox.sender())
    }

    // ── Handlers ───────────────────────────────────────────────────

    /// Register a handler at the end of the notification order.
    pub fn add(&mut self, handler: impl Handler + 'static) -> HandlerId {
        self.core.handlers.add(Box::new(handler))
    }

    /// Register an already-boxed handler.
    pub fn add_boxed(&mut self, handler: Box<dyn Handler>) -> HandlerId {
        self.core.handlers.add(handler)
    }

    /// Unregister a handler and hand it back. Unknown ids return `None`.
    pub fn remove(&mut self, id: HandlerId) -> Option<Box<dyn Handler>> {
        self.core.handlers.remove(id)
    }

    /// The registered handlers.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.core.handlers
    }

    // ── Scheduling ─────────────────────────────────────────────────

    /// Schedule a deferred call on the loop's own queue.
    ///
    /// Shorthand for `queue_mut().schedule(..)`; from other threads use
    /// [`LoopHandle::post`].
    pub fn schedule(
        &mut self,
        at: Seconds,
        func: MsgFn<C>,
        identity: Identity,
        payload: &[u8],
    ) -> Result<(), ScheduleError> {
        self.core.queue.schedule(at, func, identity, payload)
    }

    /// The deferred queue.
    pub fn queue(&self) -> &DeferredQueue<C> {
        &self.core.queue
    }

    /// The deferred queue, mutably.
    pub fn queue_mut(&mut self) -> &mut DeferredQueue<C> {
        &mut self.core.queue
    }

    /// The context handed to deferred calls.
    pub fn context(&self) -> &C {
        &self.core.context
    }

    /// The context handed to deferred calls, mutably.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.core.context
    }

    // ── Timing ─────────────────────────────────────────────────────

    /// Target time between ticks.
    pub fn interval(&self) -> Duration {
        self.core.interval
    }

    /// Change the target interval, clamped to at least [`MIN_INTERVAL`].
    pub fn set_interval(&mut self, interval: Duration) {
        if interval < MIN_INTERVAL {
            warn!(
                requested_us = interval.as_micros() as u64,
                min_us = MIN_INTERVAL.as_micros() as u64,
                "tick interval clamped"
            );
        }
        self.core.interval = interval.max(MIN_INTERVAL);
    }

    /// Wall time between the two most recent ticks.
    pub fn measured_interval(&self) -> Duration {
        self.core.measured_interval
    }

    /// Smoothed lateness of ticks relative to the interval.
    pub fn cpu(&self) -> f64 {
        self.core.cpu
    }

    /// Scheduler time.
    pub fn now(&self) -> Seconds {
        self.core.queue.now()
    }

    /// Wall time since the loop was created, in seconds.
    pub fn realtime(&self) -> Seconds {
        self.core.clock.now().saturating_sub(self.core.t0).as_secs_f64()
    }

    /// Clock reading at creation.
    pub fn t0(&self) -> Duration {
        self.core.t0
    }

    /// Metrics from the most recent tick.
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.core.metrics
    }
}

impl<C> fmt::Debug for MainLoop<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop")
            .field("driver", &self.driver)
            .field("running", &self.is_running())
            .field("interval", &self.core.interval)
            .field("now", &self.now())
            .field("pending", &self.core.queue.len())
            .field("handlers", &self.core.handlers.len())
            .field("ticks", &self.core.ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use metronome_queue::Delivery;
    use metronome_test_utils::ManualClock;

    use crate::driver::UserHooks;

    struct Log(Rc<RefCell<Vec<String>>>);

    impl Handler for Log {
        fn on_tick(&mut self, info: &TickInfo) {
            self.0.borrow_mut().push(format!("tick {}", info.tick));
        }

        fn on_exit(&mut self) {
            self.0.borrow_mut().push("exit".to_string());
        }
    }

    fn record(log: &mut Vec<Seconds>, now: Seconds, _payload: &[u8]) -> Delivery {
        log.push(now);
        Delivery::Done
    }

    fn stepped_loop() -> (MainLoop<Vec<Seconds>>, ManualClock) {
        let clock = ManualClock::new();
        let main_loop = MainLoop::with_context(Vec::new()).with_clock(clock.clone());
        (main_loop, clock)
    }

    #[test]
    fn defaults() {
        let main_loop = MainLoop::new();
        assert_eq!(main_loop.interval(), Duration::from_millis(10));
        assert_eq!(main_loop.measured_interval(), Duration::from_millis(10));
        assert_eq!(main_loop.cpu(), 0.0);
        assert_eq!(main_loop.now(), 0.0);
        assert!(!main_loop.is_running());
        assert!(!main_loop.driver().is_host());
        assert_eq!(main_loop.queue().capacity(), 128);
    }

    #[test]
    fn interval_is_clamped() {
        let mut main_loop = MainLoop::new();
        main_loop.set_interval(Duration::from_micros(10));
        assert_eq!(main_loop.interval(), MIN_INTERVAL);
        main_loop.set_interval(Duration::from_millis(20));
        assert_eq!(main_loop.interval(), Duration::from_millis(20));
    }

    #[test]
    fn with_config_validates() {
        let bad = LoopConfig {
            inbox_capacity: 0,
            ..LoopConfig::default()
        };
        assert_eq!(
            MainLoop::with_config(bad, ()).err(),
            Some(ConfigError::ZeroInboxCapacity)
        );

        let good = LoopConfig {
            queue: QueueConfig::with_capacity(3),
            ..LoopConfig::default()
        };
        let main_loop = MainLoop::with_config(good, ()).unwrap();
        assert_eq!(main_loop.queue().capacity(), 3);
    }

    #[test]
    fn tick_runs_calls_due_by_wall_time() {
        let (mut main_loop, clock) = stepped_loop();
        main_loop.schedule(0.005, record, Identity::NONE, &[]).unwrap();
        main_loop.schedule(0.015, record, Identity::NONE, &[]).unwrap();

        clock.advance_ms(10);
        let info = main_loop.tick();
        assert_eq!(info.tick, 1);
        assert_eq!(info.now, 0.01);
        assert_eq!(main_loop.context(), &[0.005]);
        assert_eq!(main_loop.last_metrics().fired, 1);

        clock.advance_ms(10);
        main_loop.tick();
        assert_eq!(main_loop.context(), &[0.005, 0.015]);
        assert_eq!(main_loop.now(), 0.02);
        assert_eq!(main_loop.realtime(), 0.02);
    }

    #[test]
    fn cpu_tracks_lateness() {
        let (mut main_loop, clock) = stepped_loop();
        main_loop.set_interval(Duration::from_millis(10));

        clock.advance_ms(10);
        main_loop.tick();
        assert_eq!(main_loop.cpu(), 0.0);
        assert_eq!(main_loop.measured_interval(), Duration::from_millis(10));

        clock.advance_ms(20);
        main_loop.tick();
        // One tick at double the interval: 0.1 * (1.0 - 0.0).
        assert!((main_loop.cpu() - 0.1).abs() < 1e-12);
        assert_eq!(main_loop.last_metrics().measured_interval_us, 20_000);
    }

    #[test]
    fn clock_stepping_backwards_measures_zero() {
        let (mut main_loop, clock) = stepped_loop();
        clock.set(Duration::from_millis(50));
        main_loop.tick();
        assert_eq!(main_loop.measured_interval(), Duration::from_millis(50));

        clock.set(Duration::from_millis(30));
        let info = main_loop.tick();
        assert_eq!(info.measured_interval, Duration::ZERO);
        // Scheduler time never runs backwards.
        assert_eq!(main_loop.now(), 0.05);
        assert!((main_loop.realtime() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn attach_stop_transitions() {
        let (mut main_loop, _clock) = stepped_loop();
        main_loop.attach();
        assert!(main_loop.is_running());
        main_loop.attach();
        assert!(main_loop.is_running());
        main_loop.stop();
        assert!(!main_loop.is_running());
        main_loop.stop();
        assert!(!main_loop.is_running());
    }

    #[test]
    fn sleep_backend_runs_until_handle_stops_it() {
        struct StopAfter {
            remaining: u32,
            handle: LoopHandle<()>,
        }

        impl Handler for StopAfter {
            fn on_tick(&mut self, _info: &TickInfo) {
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.handle.stop();
                }
            }
        }

        let mut main_loop = MainLoop::new();
        main_loop.set_interval(MIN_INTERVAL);
        let handle = main_loop.handle();
        main_loop.add(StopAfter {
            remaining: 3,
            handle,
        });
        main_loop.start();
        assert!(!main_loop.is_running());
        assert_eq!(main_loop.last_metrics().tick, 3);
    }

    #[test]
    fn start_calls_exit_after_host_returns() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (mut main_loop, _clock) = stepped_loop();
        main_loop.add(Log(Rc::clone(&log)));
        main_loop.set_driver(Driver::host(UserHooks::new(|_, pump| {
            pump.tick();
            pump.tick();
        })));
        main_loop.start();
        assert_eq!(*log.borrow(), ["tick 1", "tick 2", "exit"]);
        assert!(!main_loop.is_running());
    }

    #[test]
    fn host_sees_running_during_enter() {
        let seen = Rc::new(Cell::new(false));
        let seen_in_host = Rc::clone(&seen);
        let mut main_loop = MainLoop::new();
        main_loop.set_driver(Driver::host(UserHooks::new(move |interval, pump| {
            seen_in_host.set(pump.is_running() && interval == pump.interval());
        })));
        main_loop.start();
        assert!(seen.get());
    }

    #[test]
    fn start_is_a_no_op_while_attached() {
        let entered = Rc::new(Cell::new(0));
        let counter = Rc::clone(&entered);
        let mut main_loop = MainLoop::new();
        main_loop.set_driver(Driver::host(UserHooks::new(move |_, _| {
            counter.set(counter.get() + 1);
        })));
        main_loop.attach();
        main_loop.start();
        assert_eq!(entered.get(), 0);
        main_loop.stop();
        main_loop.start();
        assert_eq!(entered.get(), 1);
    }

    #[test]
    fn removed_handler_is_not_notified() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (mut main_loop, _clock) = stepped_loop();
        let id = main_loop.add(Log(Rc::clone(&log)));
        main_loop.tick();
        assert!(main_loop.remove(id).is_some());
        main_loop.tick();
        main_loop.exit();
        assert_eq!(*log.borrow(), ["tick 1"]);
        assert!(main_loop.remove(id).is_none());
    }

    #[test]
    fn posts_arrive_on_next_tick() {
        let (mut main_loop, clock) = stepped_loop();
        let handle = main_loop.handle();
        handle.post(0.0, record, Identity::NONE, &[]).unwrap();
        assert!(main_loop.queue().is_empty());

        clock.advance_ms(1);
        main_loop.tick();
        assert_eq!(main_loop.last_metrics().drained, 1);
        assert_eq!(main_loop.last_metrics().fired, 1);
        assert_eq!(main_loop.context().len(), 1);
    }

    #[test]
    fn post_after_drop_reports_shutdown() {
        let main_loop = MainLoop::new();
        let handle = main_loop.handle();
        drop(main_loop);
        fn noop(_: &mut (), _: Seconds, _: &[u8]) -> Delivery {
            Delivery::Done
        }
        assert_eq!(
            handle.post(0.0, noop, Identity::NONE, &[]),
            Err(metronome_core::PostError::Shutdown)
        );
    }
}
