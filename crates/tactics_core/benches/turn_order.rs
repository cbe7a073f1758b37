//! Turn-order benchmarks for tactics_core.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{engine_with, id, large_roster};

/// Stage changes on initiative force a full double-turn recompute each time.
pub fn recompute_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("initiative_change");
    for size in [8u32, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut engine = engine_with(large_roster(size));
            let mut delta = 1;
            b.iter(|| {
                let change =
                    engine.change_stat(id(1), Stat::Initiative, delta, ChangeSource::Environment);
                delta = -delta;
                black_box(change)
            });
        });
    }
    group.finish();
}

/// A weather transition fans out to every carrier in one batch.
pub fn weather_benchmark(c: &mut Criterion) {
    c.bench_function("weather_toggle_256", |b| {
        let mut engine = engine_with(large_roster(256));
        b.iter(|| {
            black_box(engine.set_weather(Weather::Rain));
            black_box(engine.set_weather(Weather::Clear));
        });
    });
}

/// Snapshot and resolve a full round.
pub fn round_benchmark(c: &mut Criterion) {
    c.bench_function("full_round_64", |b| {
        let mut engine = engine_with(large_roster(64));
        b.iter(|| {
            engine.begin_round();
            while let Some(slot) = engine.next_turn() {
                let _ = black_box(engine.end_turn(slot.id));
            }
        });
    });
}

criterion_group!(benches, recompute_benchmark, weather_benchmark, round_benchmark);
criterion_main!(benches);
