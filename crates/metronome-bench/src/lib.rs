//! Benchmark workloads and utilities for the Metronome primitives.
//!
//! - [`spread_times`]: deterministic pseudo-random due times
//! - [`filled_queue`]: a queue pre-loaded with counting calls
//! - [`count`]: the cheapest possible deferred call

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use metronome_core::{Identity, Seconds};
use metronome_queue::{DeferredQueue, Delivery};

/// Deferred call that increments its context.
pub fn count(calls: &mut u64, _now: Seconds, _payload: &[u8]) -> Delivery {
    *calls += 1;
    Delivery::Done
}

/// `n` due times in `[0, span)` from a fixed-seed linear congruential
/// generator, so every run schedules the same sequence.
pub fn spread_times(n: usize, span: Seconds, seed: u64) -> Vec<Seconds> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            unit * span
        })
        .collect()
}

/// A queue of exactly `times.len()` slots, filled with [`count`] calls.
///
/// # Panics
///
/// Panics if `times` is empty.
pub fn filled_queue(times: &[Seconds]) -> DeferredQueue<u64> {
    let mut queue = DeferredQueue::new(times.len());
    for &at in times {
        if queue.schedule(at, count, Identity::NONE, &[]).is_err() {
            unreachable!("queue sized to fit every time");
        }
    }
    queue
}
