//! Main-loop driver for Metronome.
//!
//! A [`MainLoop`] owns a [`DeferredQueue`](metronome_queue::DeferredQueue),
//! samples a wall clock once per tick, runs every deferred call that has
//! come due, and notifies registered [`Handler`]s in registration order.
//!
//! Two backends drive the ticks:
//!
//! - [`Driver::Sleep`] blocks the calling thread in `start()`, sleeping one
//!   interval between ticks.
//! - [`Driver::Host`] hands a [`Pump`] to an external event system through
//!   [`DriverHooks`], which then calls `tick()` from its own timer.
//!
//! Other threads reach a running loop only through a [`LoopHandle`]: an
//! atomic stop flag plus a bounded channel of deferred calls that the loop
//! drains at the start of every tick.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
pub mod handler;
pub mod inbox;
pub mod main_loop;
pub mod metrics;

pub use config::{LoopConfig, MIN_INTERVAL};
pub use driver::{Driver, DriverHooks, Pump, UserHooks};
pub use handler::{Handler, HandlerRegistry, TickInfo};
pub use inbox::LoopHandle;
pub use main_loop::MainLoop;
pub use metrics::TickMetrics;
