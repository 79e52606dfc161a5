//! Criterion micro-benchmarks for deferred queue scheduling and dispatch.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use metronome_bench::{count, filled_queue, spread_times};
use metronome_core::Identity;
use metronome_queue::DeferredQueue;

fn bench_schedule_in_order(c: &mut Criterion) {
    c.bench_function("schedule_append_1k", |b| {
        b.iter_batched(
            || DeferredQueue::<u64>::new(1024),
            |mut queue| {
                for i in 0..1024 {
                    let _ = queue.schedule(i as f64, count, Identity::NONE, &[]);
                }
                black_box(queue)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_schedule_random(c: &mut Criterion) {
    let times = spread_times(1024, 10.0, 42);
    c.bench_function("schedule_random_1k", |b| {
        b.iter_batched(
            || DeferredQueue::<u64>::new(1024),
            |mut queue| {
                for &at in &times {
                    let _ = queue.schedule(at, count, Identity::NONE, &[]);
                }
                black_box(queue)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_update_drain(c: &mut Criterion) {
    let times = spread_times(1024, 10.0, 42);
    c.bench_function("update_drain_1k", |b| {
        b.iter_batched(
            || filled_queue(&times),
            |mut queue| {
                let mut calls = 0u64;
                queue.update(10.0, &mut calls);
                black_box(calls)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_steady_state(c: &mut Criterion) {
    // One call in, one call out per step: the pool never grows or shrinks.
    c.bench_function("steady_state_tick", |b| {
        let mut queue = DeferredQueue::<u64>::new(64);
        let mut calls = 0u64;
        let mut now = 0.0;
        b.iter(|| {
            let _ = queue.schedule(now + 0.5, count, Identity::NONE, &[1, 2, 3, 4]);
            now += 0.01;
            queue.update(now, &mut calls);
        });
        black_box(calls);
    });
}

criterion_group!(
    benches,
    bench_schedule_in_order,
    bench_schedule_random,
    bench_update_drain,
    bench_steady_state
);
criterion_main!(benches);
