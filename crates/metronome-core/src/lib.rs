//! Core types for the Metronome scheduling primitives.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the deferred queue, the main loop, and their
//! callers: virtual time, the [`Clock`] abstraction, identifiers, and
//! error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod time;

pub use error::{ConfigError, PostError, ScheduleError};
pub use id::{HandlerId, Identity};
pub use time::{Clock, MonotonicClock, Seconds};
