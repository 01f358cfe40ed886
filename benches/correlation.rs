/// Call-stack correlation benchmarks
///
/// Every insert flattens the whole forest, so cost grows with the number of
/// calls already captured on a page.
use chrono::{DateTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use xp_profiler::captured_call::CapturedCall;
use xp_profiler::correlator::insert;

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Overlapping calls: each one ends after the next two have started
fn calls(count: i64) -> Vec<CapturedCall> {
    (0..count)
        .map(|i| CapturedCall::new(format!("req-{}", i), at(i * 10), at(i * 10 + 25)))
        .collect()
}

/// Benchmark: build a whole page trace from scratch
fn bench_build_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_trace");
    group.measurement_time(Duration::from_secs(5));

    for count in [16i64, 64, 256, 1024].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let input = calls(count);
            b.iter(|| {
                let mut forest = Vec::new();
                for call in input.iter().cloned() {
                    insert(call, &mut forest);
                }
                black_box(forest);
            });
        });
    }

    group.finish();
}

/// Benchmark: one insert into an already busy trace
fn bench_single_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_insert");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(1));

    let mut forest = Vec::new();
    for call in calls(1000) {
        insert(call, &mut forest);
    }
    let candidate = CapturedCall::new("next", at(20_000), at(20_050));

    group.bench_function("insert_after_1000", |b| {
        b.iter(|| {
            let mut forest = forest.clone();
            black_box(insert(candidate.clone(), &mut forest));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_build_trace, bench_single_insert);
criterion_main!(benches);
