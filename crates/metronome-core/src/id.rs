//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a handler registered with a main loop.
///
/// Handler IDs are assigned sequentially by the registry and are never
/// reused within one main loop, so a stale ID can never remove a handler
/// that was registered later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for HandlerId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Opaque identity key attached to a deferred call.
///
/// Cancellation matches on identity equality, never on payload contents.
/// The usual source of an identity is the address of the object a call
/// belongs to, via [`Identity::of`]; two calls scheduled on behalf of the
/// same object therefore share an identity even if their payloads differ.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(usize);

impl Identity {
    /// The identity of calls that do not belong to any particular object.
    pub const NONE: Identity = Identity(0);

    /// Identity derived from the address of `value`.
    ///
    /// The address is only a key. It is never dereferenced, so the value
    /// may be moved or dropped afterwards; the identity then simply stops
    /// corresponding to anything live.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self((value as *const T).cast::<()>() as usize)
    }

    /// Identity from a caller-chosen raw key.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw key.
    pub const fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_of_same_object_is_equal() {
        let value = [1u8, 2, 3];
        assert_eq!(Identity::of(&value), Identity::of(&value));
    }

    #[test]
    fn identity_of_distinct_objects_differs() {
        let a = 1u64;
        let b = 1u64;
        assert_ne!(Identity::of(&a), Identity::of(&b));
    }

    #[test]
    fn identity_of_unsized_uses_data_address() {
        let data = vec![0u8; 8];
        let slice: &[u8] = &data;
        assert_eq!(Identity::of(slice).as_raw(), data.as_ptr() as usize);
    }

    #[test]
    fn raw_round_trip_and_default() {
        assert_eq!(Identity::from_raw(42).as_raw(), 42);
        assert_eq!(Identity::default(), Identity::NONE);
        assert_eq!(HandlerId::from(7), HandlerId(7));
        assert_eq!(HandlerId(7).to_string(), "7");
    }
}
