//! Fixed-capacity slot arena with a free-index stack.
//!
//! [`MessagePool`] owns every slot the queue will ever use. Slots are
//! addressed by [`SlotId`] and carry one intrusive `next` link so that the
//! queue can thread its pending list through them without allocating.

use std::fmt;

/// Index of a slot within a [`MessagePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SlotId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

struct Entry<T> {
    value: Option<T>,
    next: Option<SlotId>,
}

/// Fixed-capacity pool of reusable slots.
///
/// All storage is allocated by [`new`](MessagePool::new); `alloc` and
/// `release` only move indices on and off the free stack. A slot is either
/// free (on the stack, holding no value) or live (holding a value), never
/// both.
pub struct MessagePool<T> {
    slots: Vec<Entry<T>>,
    free: Vec<SlotId>,
}

impl<T> MessagePool<T> {
    /// Create a pool with `capacity` slots, all free.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` does not fit in a `u32`.
    pub fn new(capacity: usize) -> Self {
        let count = u32::try_from(capacity)
            .unwrap_or_else(|_| panic!("MessagePool capacity {capacity} exceeds u32::MAX"));
        let slots = (0..capacity)
            .map(|_| Entry {
                value: None,
                next: None,
            })
            .collect();
        // Reverse order so the lowest index is handed out first.
        let free = (0..count).rev().map(SlotId).collect();
        Self { slots, free }
    }

    /// Move `value` into a free slot.
    ///
    /// Returns the value back if every slot is live.
    pub fn alloc(&mut self, value: T) -> Result<SlotId, T> {
        let Some(id) = self.free.pop() else {
            return Err(value);
        };
        let entry = &mut self.slots[id.index()];
        entry.value = Some(value);
        entry.next = None;
        Ok(id)
    }

    /// Return a live slot to the free stack and hand back its value.
    ///
    /// Returns `None` (and changes nothing) if the slot is already free.
    pub fn release(&mut self, id: SlotId) -> Option<T> {
        let entry = self.slots.get_mut(id.index())?;
        let value = entry.value.take()?;
        entry.next = None;
        self.free.push(id);
        Some(value)
    }

    /// The value in a live slot.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.index())?.value.as_ref()
    }

    /// Mutable access to the value in a live slot.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.index())?.value.as_mut()
    }

    /// The slot linked after `id`.
    pub fn next(&self, id: SlotId) -> Option<SlotId> {
        self.slots.get(id.index()).and_then(|e| e.next)
    }

    /// Link `next` after `id`.
    pub fn set_next(&mut self, id: SlotId, next: Option<SlotId>) {
        if let Some(entry) = self.slots.get_mut(id.index()) {
            entry.next = next;
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of live slots.
    pub fn in_use(&self) -> usize {
        self.capacity() - self.available()
    }

    /// Whether every slot is live.
    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }
}

impl<T> fmt::Debug for MessagePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish()
    }
}
