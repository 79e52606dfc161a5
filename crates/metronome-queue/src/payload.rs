//! Argument bytes carried by a deferred call.

use std::fmt;

/// Payloads up to this many bytes are stored inside the message slot.
///
/// Larger payloads are copied into a dedicated heap block that is freed
/// when the slot is recycled.
pub const INLINE_PAYLOAD_BYTES: usize = 64;

/// Argument bytes for one deferred call.
///
/// Small payloads live inside the slot; larger ones own a heap block, so
/// dropping the payload frees it exactly once. The representation is
/// private, which keeps the inline length within the inline buffer.
#[derive(Clone)]
pub struct Payload(Repr);

#[derive(Clone)]
enum Repr {
    Inline {
        len: u8,
        bytes: [u8; INLINE_PAYLOAD_BYTES],
    },
    Heap(Box<[u8]>),
}

impl Payload {
    /// Copy `bytes` into a new payload, inline when it fits.
    pub fn copy_from(bytes: &[u8]) -> Self {
        if bytes.len() <= INLINE_PAYLOAD_BYTES {
            let mut inline = [0u8; INLINE_PAYLOAD_BYTES];
            inline[..bytes.len()].copy_from_slice(bytes);
            Self(Repr::Inline {
                len: bytes.len() as u8,
                bytes: inline,
            })
        } else {
            Self(Repr::Heap(bytes.into()))
        }
    }

    /// Take ownership of already-boxed bytes, moving them inline when they
    /// fit so that no heap block outlives the call.
    pub fn from_boxed(bytes: Box<[u8]>) -> Self {
        if bytes.len() <= INLINE_PAYLOAD_BYTES {
            Self::copy_from(&bytes)
        } else {
            Self(Repr::Heap(bytes))
        }
    }

    /// The payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.0 {
            Repr::Inline { len, bytes } => &bytes[..usize::from(*len)],
            Repr::Heap(bytes) => bytes,
        }
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the bytes live inside the slot.
    pub fn is_inline(&self) -> bool {
        matches!(self.0, Repr::Inline { .. })
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::copy_from(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_boxed(bytes.into_boxed_slice())
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::copy_from(&[])
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_inline() { "Inline" } else { "Heap" };
        f.debug_struct("Payload")
            .field("kind", &kind)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payload_is_inline() {
        let p = Payload::copy_from(&[1, 2, 3]);
        assert!(p.is_inline());
        assert_eq!(p.as_bytes(), &[1, 2, 3]);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn exact_fit_is_inline() {
        let bytes = [7u8; INLINE_PAYLOAD_BYTES];
        let p = Payload::copy_from(&bytes);
        assert!(p.is_inline());
        assert_eq!(p.as_bytes(), &bytes[..]);
    }

    #[test]
    fn oversized_payload_goes_to_heap() {
        let bytes: Vec<u8> = (0..=INLINE_PAYLOAD_BYTES as u8).collect();
        let p = Payload::copy_from(&bytes);
        assert!(!p.is_inline());
        assert_eq!(p.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn boxed_small_payload_moves_inline() {
        let p = Payload::from_boxed(vec![9u8; 4].into_boxed_slice());
        assert!(p.is_inline());
        assert_eq!(p.as_bytes(), &[9, 9, 9, 9]);
    }

    #[test]
    fn every_inline_length_round_trips() {
        for n in 0..=INLINE_PAYLOAD_BYTES {
            let bytes: Vec<u8> = (0..n as u8).collect();
            let p = Payload::from(bytes.clone());
            assert!(p.is_inline());
            assert_eq!(p.len(), n);
            assert_eq!(p.as_bytes(), bytes.as_slice());
        }
    }

    #[test]
    fn vec_conversion_keeps_large_block_on_heap() {
        let p = Payload::from(vec![1u8; INLINE_PAYLOAD_BYTES * 2]);
        assert!(!p.is_inline());
        assert_eq!(p.len(), INLINE_PAYLOAD_BYTES * 2);
    }

    #[test]
    fn default_is_empty_inline() {
        let p = Payload::default();
        assert!(p.is_empty());
        assert!(p.is_inline());
    }
}
