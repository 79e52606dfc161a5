//! Backends that decide when the main loop ticks.
//!
//! The sleep backend is built in. A host backend lets an external event
//! system (a window toolkit, an audio callback scheduler) own the thread:
//! the loop hands it a [`Pump`] and the host calls [`Pump::tick`] from its
//! own timer until [`Pump::is_running`] turns false.

use std::fmt;
use std::time::Duration;

use crate::handler::TickInfo;

/// The loop as seen by a host backend.
pub trait Pump {
    /// Run one tick now.
    fn tick(&mut self) -> TickInfo;

    /// Whether the loop still wants ticks. Hosts return from
    /// [`DriverHooks::enter`] once this is false.
    fn is_running(&self) -> bool;

    /// Current target interval between ticks.
    fn interval(&self) -> Duration;
}

/// Callbacks an external event system implements to drive the loop.
///
/// Only [`enter`](Self::enter) is required.
pub trait DriverHooks {
    /// Called once when the backend is installed with
    /// [`MainLoop::set_driver`](crate::MainLoop::set_driver).
    fn init(&mut self) {}

    /// Called by [`MainLoop::attach`](crate::MainLoop::attach): start a
    /// timer that calls `tick()` every `interval`, without taking the
    /// thread.
    fn attach(&mut self, _interval: Duration) {}

    /// Called by [`MainLoop::start`](crate::MainLoop::start): run the host's
    /// event loop, ticking `pump`, until `pump.is_running()` is false.
    fn enter(&mut self, interval: Duration, pump: &mut dyn Pump);

    /// Called by [`MainLoop::stop`](crate::MainLoop::stop): cancel the timer
    /// or break out of the host's event loop.
    fn stop(&mut self) {}
}

/// Which backend drives the loop.
#[derive(Default)]
pub enum Driver {
    /// Block in `start()`, sleeping one interval before each tick.
    #[default]
    Sleep,
    /// Delegate to an external event system.
    Host(Box<dyn DriverHooks>),
}

impl Driver {
    /// Host backend from any [`DriverHooks`] implementation.
    pub fn host(hooks: impl DriverHooks + 'static) -> Self {
        Self::Host(Box::new(hooks))
    }

    /// Whether this is a host backend.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Host(_) => "host",
        }
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type EnterFn = Box<dyn FnMut(Duration, &mut dyn Pump)>;
type AttachFn = Box<dyn FnMut(Duration)>;
type SimpleFn = Box<dyn FnMut()>;

/// [`DriverHooks`] assembled from closures.
///
/// ```
/// use metronome_engine::{Driver, MainLoop, UserHooks};
///
/// let hooks = UserHooks::new(|_interval, pump| {
///     while pump.is_running() {
///         let info = pump.tick();
///         if info.tick == 3 {
///             break;
///         }
///     }
/// });
/// let mut main_loop = MainLoop::new();
/// main_loop.set_driver(Driver::host(hooks));
/// main_loop.start();
/// assert_eq!(main_loop.last_metrics().tick, 3);
/// ```
pub struct UserHooks {
    enter: EnterFn,
    init: Option<SimpleFn>,
    attach: Option<AttachFn>,
    stop: Option<SimpleFn>,
}

impl UserHooks {
    /// Hooks with the given `enter` behavior and no-op init/attach/stop.
    pub fn new(enter: impl FnMut(Duration, &mut dyn Pump) + 'static) -> Self {
        Self {
            enter: Box::new(enter),
            init: None,
            attach: None,
            stop: None,
        }
    }

    /// Run `f` when the backend is installed.
    pub fn on_init(mut self, f: impl FnMut() + 'static) -> Self {
        self.init = Some(Box::new(f));
        self
    }

    /// Run `f` when the loop is attached.
    pub fn on_attach(mut self, f: impl FnMut(Duration) + 'static) -> Self {
        self.attach = Some(Box::new(f));
        self
    }

    /// Run `f` when the loop is stopped.
    pub fn on_stop(mut self, f: impl FnMut() + 'static) -> Self {
        self.stop = Some(Box::new(f));
        self
    }
}

impl DriverHooks for UserHooks {
    fn init(&mut self) {
        if let Some(f) = self.init.as_mut() {
            f();
        }
    }

    fn attach(&mut self, interval: Duration) {
        if let Some(f) = self.attach.as_mut() {
            f(interval);
        }
    }

    fn enter(&mut self, interval: Duration, pump: &mut dyn Pump) {
        (self.enter)(interval, pump);
    }

    fn stop(&mut self) {
        if let Some(f) = self.stop.as_mut() {
            f();
        }
    }
}

impl fmt::Debug for UserHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserHooks")
            .field("init", &self.init.is_some())
            .field("attach", &self.attach.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}
