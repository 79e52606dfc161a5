//! Lock-free byte ring buffer for passing data between two threads.
//!
//! [`RingBuffer`] moves raw bytes from exactly one producer thread to
//! exactly one consumer thread, for example from a real-time audio callback
//! to a logic thread. Neither side ever blocks or allocates: every
//! operation copies as many bytes as currently fit and returns the count.
//!
//! The buffer never interprets its contents. Both ends must agree on the
//! payload layout out of band.
//!
//! ```
//! use metronome_ring::RingBuffer;
//!
//! let (mut producer, mut consumer) = RingBuffer::new(10).split();
//! assert_eq!(producer.capacity(), 16);
//! assert_eq!(producer.write(b"hello"), 5);
//!
//! let mut out = [0u8; 8];
//! assert_eq!(consumer.read(&mut out), 5);
//! assert_eq!(&out[..5], b"hello");
//! ```
//!
//! This is the only crate in the workspace that contains `unsafe` code;
//! it is confined to the byte copies in `ring.rs`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

mod ring;

pub use ring::{Consumer, Producer, RingBuffer};
