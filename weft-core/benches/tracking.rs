//! Benchmarks for dependency tracking and trigger fan-out.
//!
//! Run with: cargo bench -p weft-core

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use weft_core::{batch, effect, track, trigger, Effect, TargetId};

/// Register `n` effects that all read the same key, returning the handles so
/// the bench can dispose them when the measurement is done.
fn make_readers(target: TargetId, n: usize) -> Vec<Effect> {
    (0..n)
        .map(|_| {
            effect(move || {
                track(target, "value");
            })
        })
        .collect()
}

fn bench_track(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracking/track");

    // No effect is active on the bench thread, so this measures the no-op
    // path every untracked read takes. The tracked insert path is measured
    // through re-runs in `bench_effect_rerun`, where an effect is active.
    let target = TargetId::new();
    group.bench_function("untracked_read", |b| {
        b.iter(|| track(black_box(target), "value"))
    });

    group.finish();
}

fn bench_trigger_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracking/trigger");

    for n in [1, 10, 100, 1000] {
        let target = TargetId::new();
        let readers = make_readers(target, n);

        group.bench_with_input(BenchmarkId::new("fanout", n), &target, |b, &target| {
            b.iter(|| trigger(black_box(target), "value"))
        });

        for reader in readers {
            reader.dispose();
        }
    }

    // A key nobody reads: the early-return path every untracked write takes.
    let silent = TargetId::new();
    group.bench_function("no_dependents", |b| {
        b.iter(|| trigger(black_box(silent), "value"))
    });

    group.finish();
}

fn bench_effect_rerun(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracking/rerun");

    // One effect, varying dependency counts: each re-run releases and
    // re-records every edge.
    for deps in [1, 8, 64] {
        let targets: Vec<TargetId> = (0..deps).map(|_| TargetId::new()).collect();
        let reader = effect({
            let targets = targets.clone();
            move || {
                for &target in &targets {
                    track(target, "value");
                }
            }
        });

        group.bench_with_input(BenchmarkId::new("edges", deps), &targets[0], |b, &first| {
            b.iter(|| trigger(black_box(first), "value"))
        });

        reader.dispose();
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracking/batch");

    let target = TargetId::new();
    let reader = effect(move || {
        track(target, "a");
        track(target, "b");
        track(target, "c");
    });

    // Three writes to keys sharing a dependent: one re-run batched, three
    // unbatched.
    group.bench_function("coalesced_writes", |b| {
        b.iter(|| {
            batch(|| {
                trigger(black_box(target), "a");
                trigger(black_box(target), "b");
                trigger(black_box(target), "c");
            })
        })
    });

    group.bench_function("synchronous_writes", |b| {
        b.iter(|| {
            trigger(black_box(target), "a");
            trigger(black_box(target), "b");
            trigger(black_box(target), "c");
        })
    });

    group.finish();
    reader.dispose();
}

criterion_group!(
    benches,
    bench_track,
    bench_trigger_fanout,
    bench_effect_rerun,
    bench_batch
);
criterion_main!(benches);
