//! Deferred-execution scheduler for Metronome.
//!
//! A [`DeferredQueue`] holds function calls waiting for a virtual time.
//! Calls live in a fixed [`MessagePool`] allocated up front, so scheduling
//! never allocates unless a payload is too large for a slot's inline
//! buffer.
//!
//! # Architecture
//!
//! ```text
//! DeferredQueue
//! ├── head / tail ──► pending list (sorted by time, FIFO among ties)
//! └── MessagePool
//!     ├── slots: Vec<Entry>   (message + next link)
//!     └── free:  Vec<SlotId>  (stack of unused slots)
//! ```
//!
//! Links are `SlotId` indices into the pool rather than pointers, so a
//! recycled slot can never be reached through a stale link.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod payload;
pub mod pool;
pub mod queue;

pub use config::QueueConfig;
pub use payload::{Payload, INLINE_PAYLOAD_BYTES};
pub use pool::{MessagePool, SlotId};
pub use queue::{Delivery, DeferredQueue, MsgFn};
