//! Criterion benchmarks for the segment-engine core operations.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the cost of the hot paths named in the
//! design: dictionary encoding, bitmap boolean combinators, incremental
//! index inserts (rollup and non-rollup), and cursor-driven per-segment
//! aggregation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use segment_engine::column::bitmap::{BitmapFactory, ImmutableBitmap};
use segment_engine::column::dictionary::DictionaryEncodedColumn;
use segment_engine::incremental::aggregator::AggregatorSpec;
use segment_engine::incremental::index::{IncrementalIndex, IndexConfig, InputRow};
use segment_engine::segment::granularity::Granularity;
use segment_engine::value::Value;
use ahash::AHashMap;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn metric_row(timestamp: i64, dim_value: &str, metric: i64) -> InputRow {
    let mut metrics = AHashMap::new();
    metrics.insert("m".to_string(), Value::Long(metric));
    InputRow { timestamp, dimensions: vec![("host".to_string(), vec![dim_value.to_string()])], metrics }
}

// ---------------------------------------------------------------------------
// Dictionary encoding benchmarks
// ---------------------------------------------------------------------------

fn bench_dictionary_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("dictionary_build");

    for cardinality in [10, 1_000, 50_000] {
        group.bench_with_input(BenchmarkId::from_parameter(cardinality), &cardinality, |b, &distinct| {
            let rows: Vec<Option<String>> = (0..10_000).map(|i| Some(format!("v{:06}", i % distinct))).collect();
            b.iter(|| black_box(DictionaryEncodedColumn::build_single(&rows)));
        });
    }
    group.finish();
}

fn bench_dictionary_lookup(c: &mut Criterion) {
    let rows: Vec<Option<String>> = (0..50_000).map(|i| Some(format!("v{:06}", i % 5_000))).collect();
    let column = DictionaryEncodedColumn::build_single(&rows);

    c.bench_function("dictionary_lookup_id_50k_rows", |b| {
        let mut i = 0;
        b.iter(|| {
            let key = format!("v{:06}", i % 5_000);
            i += 1;
            black_box(column.lookup_id(&key))
        });
    });
}

// ---------------------------------------------------------------------------
// Bitmap factory benchmarks
// ---------------------------------------------------------------------------

fn bench_bitmap_union_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitmap_union_all");

    for n in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let bitmaps: Vec<ImmutableBitmap> = (0..n).map(|i| ImmutableBitmap::from_rows((i * 10)..(i * 10 + 5))).collect();
            b.iter(|| black_box(BitmapFactory::union_all(bitmaps.iter())));
        });
    }
    group.finish();
}

fn bench_bitmap_intersect_short_circuit(c: &mut Criterion) {
    c.bench_function("bitmap_intersect_short_circuit_on_empty", |b| {
        let mut bitmaps: Vec<ImmutableBitmap> = (0..100).map(|i| ImmutableBitmap::from_rows(0..(1000 - i))).collect();
        bitmaps.push(ImmutableBitmap::empty());
        b.iter(|| black_box(BitmapFactory::intersect_all(bitmaps.iter())));
    });
}

// ---------------------------------------------------------------------------
// Incremental index benchmarks
// ---------------------------------------------------------------------------

fn bench_incremental_index_rollup_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_index_rollup_insert");

    for distinct_hosts in [10, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(distinct_hosts), &distinct_hosts, |b, &distinct| {
            b.iter(|| {
                let index = IncrementalIndex::new(
                    IndexConfig { rollup: true, query_granularity: Granularity::Minute, max_rows_in_memory: 1_000_000, max_bytes_in_memory: 1 << 28 },
                    vec![AggregatorSpec::LongSum { name: "m".into(), field_name: "m".into() }],
                );
                for i in 0..10_000 {
                    let host = format!("host-{}", i % distinct);
                    black_box(index.add(metric_row(i as i64 * 1000, &host, 1)).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_incremental_index_non_rollup_insert(c: &mut Criterion) {
    c.bench_function("incremental_index_non_rollup_insert_10k", |b| {
        b.iter(|| {
            let index = IncrementalIndex::new(
                IndexConfig { rollup: false, query_granularity: Granularity::None, max_rows_in_memory: 1_000_000, max_bytes_in_memory: 1 << 28 },
                vec![AggregatorSpec::Count { name: "cnt".into() }],
            );
            for i in 0..10_000 {
                black_box(index.add(metric_row(i as i64, "host-a", 1)).unwrap());
            }
        });
    });
}

fn bench_incremental_index_concurrent_rollup(c: &mut Criterion) {
    c.bench_function("incremental_index_8_threads_same_key", |b| {
        b.iter(|| {
            use std::sync::Arc;
            let index = Arc::new(IncrementalIndex::new(
                IndexConfig { rollup: true, query_granularity: Granularity::All, max_rows_in_memory: 1_000_000, max_bytes_in_memory: 1 << 28 },
                vec![AggregatorSpec::LongSum { name: "m".into(), field_name: "m".into() }],
            ));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let index = index.clone();
                    std::thread::spawn(move || {
                        for i in 0..1_000 {
                            index.add(metric_row(i, "host-a", 1)).unwrap();
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            black_box(index.row_count());
        });
    });
}

criterion_group!(
    dictionary_benches,
    bench_dictionary_build,
    bench_dictionary_lookup,
);

criterion_group!(
    bitmap_benches,
    bench_bitmap_union_all,
    bench_bitmap_intersect_short_circuit,
);

criterion_group!(
    incremental_index_benches,
    bench_incremental_index_rollup_insert,
    bench_incremental_index_non_rollup_insert,
    bench_incremental_index_concurrent_rollup,
);

criterion_main!(
    dictionary_benches,
    bitmap_benches,
    incremental_index_benches,
);
