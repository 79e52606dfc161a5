//! End-to-end scheduling behavior through the public queue API.

use metronome_core::{Identity, ScheduleError};
use metronome_queue::{DeferredQueue, QueueConfig, INLINE_PAYLOAD_BYTES};
use metronome_test_utils::{record, retry_until_ready, Recorder};

#[test]
fn four_slot_pool_fires_in_time_order() {
    let mut queue = DeferredQueue::new(4);
    for (at, tag) in [(1.0, 1u8), (1.0, 2), (2.0, 3), (3.0, 4)] {
        queue.schedule(at, record, Identity::NONE, &[tag]).unwrap();
    }
    assert_eq!(
        queue.schedule(4.0, record, Identity::NONE, &[5]),
        Err(ScheduleError::CapacityExceeded { capacity: 4 })
    );

    let mut rec = Recorder::new();
    assert_eq!(queue.update(2.0, &mut rec), 3);
    assert_eq!(rec.tags(), [1, 2, 3]);
    assert_eq!(rec.times(), [1.0, 1.0, 2.0]);
    assert_eq!(queue.now(), 2.0);
    assert_eq!(queue.available(), 3);

    assert_eq!(queue.update(10.0, &mut rec), 1);
    assert_eq!(rec.tags(), [1, 2, 3, 4]);
    assert_eq!(queue.now(), 10.0);
}

#[test]
fn pool_is_reusable_after_exhaustion() {
    let mut queue = DeferredQueue::new(2);
    let mut rec = Recorder::new();
    for round in 0..5u8 {
        queue.schedule(f64::from(round), record, Identity::NONE, &[round]).unwrap();
        queue.schedule(f64::from(round), record, Identity::NONE, &[round]).unwrap();
        assert!(queue.schedule(f64::from(round), record, Identity::NONE, &[]).is_err());
        queue.update(f64::from(round), &mut rec);
        assert_eq!(queue.available(), 2);
    }
    assert_eq!(rec.calls.len(), 10);
}

#[test]
fn oversized_payload_survives_until_invocation() {
    let mut queue = DeferredQueue::new(2);
    let big: Vec<u8> = (0..=255).collect();
    assert!(big.len() > INLINE_PAYLOAD_BYTES);
    queue.schedule(0.5, record, Identity::NONE, &big).unwrap();

    let mut rec = Recorder::new();
    queue.update(1.0, &mut rec);
    assert_eq!(rec.calls[0].payload, big);
}

#[test]
fn retry_reschedules_until_ready() {
    let config = QueueConfig {
        capacity: 4,
        retry_period: 0.25,
    };
    let mut queue = DeferredQueue::from_config(&config).unwrap();
    queue.schedule(0.0, retry_until_ready, Identity::NONE, b"r").unwrap();

    let mut rec = Recorder::new();
    // One attempt per update, however far `until` reaches.
    queue.update(0.0, &mut rec);
    queue.update(0.3, &mut rec);
    queue.update(0.6, &mut rec);
    assert_eq!(rec.times(), [0.0, 0.25, 0.5]);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.next_due(), Some(0.75));

    rec.ready = true;
    queue.update(1.0, &mut rec);
    assert_eq!(rec.times(), [0.0, 0.25, 0.5, 0.75]);
    assert!(queue.is_empty());
}

#[test]
fn cancel_matches_function_and_identity() {
    struct Widget(#[allow(dead_code)] u32);
    let (a, b) = (Widget(1), Widget(2));
    let (id_a, id_b) = (Identity::of(&a), Identity::of(&b));

    let mut queue = DeferredQueue::new(8);
    queue.schedule(1.0, record, id_a, &[1]).unwrap();
    queue.schedule(2.0, record, id_b, &[2]).unwrap();
    queue.schedule(3.0, retry_until_ready, id_a, &[3]).unwrap();
    queue.schedule(4.0, record, id_a, &[4]).unwrap();

    assert_eq!(queue.cancel(record, id_a), 2);
    assert_eq!(queue.cancel(record, id_a), 0);

    let mut rec = Recorder::new();
    rec.ready = true;
    queue.update(10.0, &mut rec);
    assert_eq!(rec.tags(), [2, 3]);
}

#[test]
fn clear_drops_everything_and_rewinds() {
    let mut queue = DeferredQueue::new(4);
    let mut rec = Recorder::new();
    queue.update(5.0, &mut rec);
    queue.schedule(6.0, record, Identity::NONE, &[]).unwrap();
    queue.schedule(7.0, record, Identity::NONE, &[]).unwrap();

    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.now(), 0.0);
    assert_eq!(queue.available(), 4);
    queue.update(100.0, &mut rec);
    assert!(rec.calls.is_empty());
}
