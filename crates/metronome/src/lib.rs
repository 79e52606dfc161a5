//! Metronome: timed work and data exchange between a real-time thread, a
//! main loop, and arbitrary subsystems.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Metronome sub-crates. For most users, adding `metronome` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use metronome::prelude::*;
//!
//! #[derive(Default)]
//! struct Counter {
//!     hits: u32,
//! }
//!
//! fn hit(counter: &mut Counter, _now: Seconds, payload: &[u8]) -> Delivery {
//!     counter.hits += u32::from(payload[0]);
//!     Delivery::Done
//! }
//!
//! // Deferred calls fire once the scheduler clock reaches them.
//! let mut queue: DeferredQueue<Counter> = DeferredQueue::new(8);
//! queue.schedule(0.5, hit, Identity::NONE, &[2]).unwrap();
//! queue.schedule(1.5, hit, Identity::NONE, &[3]).unwrap();
//! let mut counter = Counter::default();
//! assert_eq!(queue.update(1.0, &mut counter), 1);
//! assert_eq!(counter.hits, 2);
//!
//! // A host-driven main loop owning its own queue and context.
//! let mut main_loop = MainLoop::with_context(Counter::default());
//! main_loop.schedule(0.0, hit, Identity::NONE, &[5]).unwrap();
//! main_loop.set_driver(Driver::host(UserHooks::new(|_, pump| {
//!     pump.tick();
//! })));
//! main_loop.start();
//! assert_eq!(main_loop.context().hits, 5);
//!
//! // Bytes between two threads without locks.
//! let (mut producer, mut consumer) = RingBuffer::new(64).split();
//! assert_eq!(producer.write(b"ping"), 4);
//! let mut buf = [0u8; 4];
//! assert_eq!(consumer.read(&mut buf), 4);
//! assert_eq!(&buf, b"ping");
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `metronome-core` | Time, clocks, identifiers, error types |
//! | [`queue`] | `metronome-queue` | Deferred-call queue, message pool, payloads |
//! | [`ring`] | `metronome-ring` | Lock-free SPSC byte ring buffer |
//! | [`engine`] | `metronome-engine` | Main loop, handlers, drivers, cross-thread handle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`metronome-core`).
///
/// Virtual time ([`types::Seconds`]), the [`types::Clock`] abstraction,
/// identifiers, and every error enum.
pub use metronome_core as types;

/// Deferred-call queue (`metronome-queue`).
///
/// [`queue::DeferredQueue`] over a fixed [`queue::MessagePool`].
pub use metronome_queue as queue;

/// Lock-free SPSC byte ring buffer (`metronome-ring`).
///
/// [`ring::RingBuffer`] splits into a [`ring::Producer`] and a
/// [`ring::Consumer`] for use on two threads.
pub use metronome_ring as ring;

/// Main-loop driver (`metronome-engine`).
///
/// [`engine::MainLoop`] with the sleep backend or any
/// [`engine::DriverHooks`] host backend.
pub use metronome_engine as engine;

/// Common imports for typical Metronome usage.
///
/// ```rust
/// use metronome::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use metronome_core::{Clock, HandlerId, Identity, MonotonicClock, Seconds};

    // Errors
    pub use metronome_core::{ConfigError, PostError, ScheduleError};

    // Queue
    pub use metronome_queue::{DeferredQueue, Delivery, MsgFn, Payload, QueueConfig};

    // Ring
    pub use metronome_ring::{Consumer, Producer, RingBuffer};

    // Engine
    pub use metronome_engine::{
        Driver, DriverHooks, Handler, LoopConfig, LoopHandle, MainLoop, Pump, TickInfo,
        TickMetrics, UserHooks,
    };
}
