//! Ring storage, cursor arithmetic, and the producer/consumer halves.
//!
//! # Protocol
//!
//! Capacity is a power of two, so cursors wrap with `& mask`. The write
//! cursor is stored only by the producer and the read cursor only by the
//! consumer. Each side publishes its cursor with `Release` after copying,
//! and loads the other side's cursor with `Acquire` before copying, so:
//!
//! - the consumer never sees a write cursor ahead of the bytes it covers;
//! - the producer never overwrites bytes the consumer is still copying out.
//!
//! One byte is always left unused: `write == read` means empty, never full.

use std::cell::UnsafeCell;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A cursor on its own cache line, so producer and consumer stores do not
/// contend.
#[repr(align(64))]
struct Cursor(AtomicUsize);

impl Cursor {
    fn new() -> Self {
        Self(AtomicUsize::new(0))
    }
}

struct Shared {
    storage: Box<[UnsafeCell<u8>]>,
    mask: usize,
    write: Cursor,
    read: Cursor,
}

// SAFETY: `storage` is only written by the single producer in the range the
// consumer cannot see yet, and only read by the single consumer in the range
// the producer has already published. The Acquire/Release pairs on the two
// cursors order those accesses, so no byte is ever accessed by both sides at
// once. Uniqueness of each side is guaranteed by `Producer`/`Consumer` not
// being `Clone` and by `RingBuffer` requiring `&mut self`.
unsafe impl Sync for Shared {}

impl Shared {
    fn new(requested: usize) -> Self {
        let capacity = requested
            .max(2)
            .checked_next_power_of_two()
            .unwrap_or_else(|| panic!("ring buffer size {requested} is too large"));
        let storage = (0..capacity).map(|_| UnsafeCell::new(0)).collect();
        Self {
            storage,
            mask: capacity - 1,
            write: Cursor::new(),
            read: Cursor::new(),
        }
    }

    fn capacity(&self) -> usize {
        self.mask + 1
    }

    fn write_space_at(&self, read: usize, write: usize) -> usize {
        if read == write {
            return self.mask;
        }
        ((self.capacity() + read - write) & self.mask) - 1
    }

    fn read_space_at(&self, read: usize, write: usize) -> usize {
        (self.capacity() + write - read) & self.mask
    }

    fn write_space(&self) -> usize {
        let read = self.read.0.load(Ordering::Acquire);
        let write = self.write.0.load(Ordering::Acquire);
        self.write_space_at(read, write)
    }

    fn read_space(&self) -> usize {
        let read = self.read.0.load(Ordering::Acquire);
        let write = self.write.0.load(Ordering::Acquire);
        self.read_space_at(read, write)
    }

    fn base(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.storage.as_ptr())
    }

    /// Copy `src` into storage starting at `at`, wrapping at the end.
    ///
    /// # Safety
    ///
    /// Caller must be the only producer, and `src.len()` must not exceed the
    /// write space observed after an `Acquire` load of the read cursor.
    unsafe fn copy_in(&self, at: usize, src: &[u8]) {
        let first = src.len().min(self.capacity() - at);
        let base = self.base();
        // SAFETY: `at < capacity` and `first <= capacity - at`, so the first
        // copy stays in bounds; the second copy writes `src.len() - first`
        // bytes from the start, which is below `capacity` because
        // `src.len() < capacity`. The range is free per the caller contract.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), base.add(at), first);
            ptr::copy_nonoverlapping(src.as_ptr().add(first), base, src.len() - first);
        }
    }

    /// Copy from storage starting at `at` into `dst`, wrapping at the end.
    ///
    /// # Safety
    ///
    /// Caller must be the only consumer, and `dst.len()` must not exceed the
    /// read space observed after an `Acquire` load of the write cursor.
    unsafe fn copy_out(&self, at: usize, dst: &mut [u8]) {
        let first = dst.len().min(self.capacity() - at);
        let base = self.base();
        // SAFETY: bounds as in `copy_in`; the bytes were published by the
        // producer's Release store, which the caller's Acquire load observed.
        unsafe {
            ptr::copy_nonoverlapping(base.add(at), dst.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(base, dst.as_mut_ptr().add(first), dst.len() - first);
        }
    }

    /// # Safety
    ///
    /// Caller must be the only producer.
    unsafe fn write(&self, src: &[u8]) -> usize {
        let write = self.write.0.load(Ordering::Relaxed);
        let read = self.read.0.load(Ordering::Acquire);
        let n = src.len().min(self.write_space_at(read, write));
        if n == 0 {
            return 0;
        }
        // SAFETY: sole producer; `n` is within the observed write space.
        unsafe { self.copy_in(write, &src[..n]) };
        self.write.0.store((write + n) & self.mask, Ordering::Release);
        n
    }

    /// # Safety
    ///
    /// Caller must be the only consumer.
    unsafe fn peek(&self, dst: &mut [u8]) -> (usize, usize) {
        let read = self.read.0.load(Ordering::Relaxed);
        let write = self.write.0.load(Ordering::Acquire);
        let n = dst.len().min(self.read_space_at(read, write));
        if n > 0 {
            // SAFETY: sole consumer; `n` is within the observed read space.
            unsafe { self.copy_out(read, &mut dst[..n]) };
        }
        (read, n)
    }

    /// # Safety
    ///
    /// Caller must be the only consumer.
    unsafe fn read(&self, dst: &mut [u8]) -> usize {
        // SAFETY: forwarded caller contract.
        let (read, n) = unsafe { self.peek(dst) };
        if n > 0 {
            self.read.0.store((read + n) & self.mask, Ordering::Release);
        }
        n
    }

    /// Discard everything readable. Only the consumer may call this.
    fn discard(&self) {
        let write = self.write.0.load(Ordering::Acquire);
        self.read.0.store(write, Ordering::Release);
    }
}

/// Lock-free single-producer single-consumer byte ring buffer.
///
/// Holding a `RingBuffer` means owning both ends, which is useful for
/// setup and single-threaded use. Call [`split`](RingBuffer::split) to hand
/// the ends to two different threads.
pub struct RingBuffer {
    shared: Arc<Shared>,
}

impl RingBuffer {
    /// Allocate a ring buffer of at least `requested` bytes.
    ///
    /// The actual capacity is the next power of two (minimum 2); one byte of
    /// it is always reserved, so `capacity() - 1` bytes can be buffered.
    ///
    /// # Panics
    ///
    /// Panics if the rounded capacity overflows `usize`.
    pub fn new(requested: usize) -> Self {
        Self {
            shared: Arc::new(Shared::new(requested)),
        }
    }

    /// Rounded capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Bytes that can be written right now.
    pub fn write_space(&self) -> usize {
        self.shared.write_space()
    }

    /// Bytes that can be read right now.
    pub fn read_space(&self) -> usize {
        self.shared.read_space()
    }

    /// Copy as much of `src` as fits; returns the number of bytes accepted.
    pub fn write(&mut self, src: &[u8]) -> usize {
        // SAFETY: `&mut self` makes this the only producer.
        unsafe { self.shared.write(src) }
    }

    /// Copy up to `dst.len()` bytes out and consume them; returns the count.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        // SAFETY: `&mut self` makes this the only consumer.
        unsafe { self.shared.read(dst) }
    }

    /// Copy up to `dst.len()` bytes out without consuming them.
    pub fn peek(&mut self, dst: &mut [u8]) -> usize {
        // SAFETY: `&mut self` makes this the only consumer.
        unsafe { self.shared.peek(dst).1 }
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.shared.discard();
    }

    /// Separate the two ends so they can move to different threads.
    pub fn split(self) -> (Producer, Consumer) {
        let producer = Producer {
            shared: Arc::clone(&self.shared),
        };
        let consumer = Consumer {
            shared: self.shared,
        };
        (producer, consumer)
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("read_space", &self.read_space())
            .finish()
    }
}

/// Write end of a split [`RingBuffer`].
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    /// Rounded capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Bytes that can be written right now. The consumer may free more at
    /// any moment, so this is a lower bound.
    pub fn write_space(&self) -> usize {
        self.shared.write_space()
    }

    /// Copy as much of `src` as fits; returns the number of bytes accepted.
    ///
    /// Never blocks. A short count means the consumer has not caught up.
    pub fn write(&mut self, src: &[u8]) -> usize {
        // SAFETY: `Producer` is not `Clone` and `write` takes `&mut self`,
        // so this is the only producer.
        unsafe { self.shared.write(src) }
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("write_space", &self.write_space())
            .finish()
    }
}

/// Read end of a split [`RingBuffer`].
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    /// Rounded capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    /// Bytes that can be read right now. The producer may add more at any
    /// moment, so this is a lower bound.
    pub fn read_space(&self) -> usize {
        self.shared.read_space()
    }

    /// Copy up to `dst.len()` bytes out and consume them; returns the count.
    ///
    /// Never blocks. A short count means the producer has not written more.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        // SAFETY: `Consumer` is not `Clone` and `read` takes `&mut self`,
        // so this is the only consumer.
        unsafe { self.shared.read(dst) }
    }

    /// Copy up to `dst.len()` bytes out without consuming them.
    pub fn peek(&mut self, dst: &mut [u8]) -> usize {
        // SAFETY: as for `read`.
        unsafe { self.shared.peek(dst).1 }
    }

    /// Discard everything the producer has published so far.
    pub fn clear(&mut self) {
        self.shared.discard();
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("read_space", &self.read_space())
            .finish()
    }
}

// Compile-time assertion: both halves can move to other threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Producer>();
    assert::<Consumer>();
};
