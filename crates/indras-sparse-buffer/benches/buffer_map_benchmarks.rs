//! Sparse buffer map performance benchmarks
//!
//! Benchmarks for the hot paths of the write buffer:
//! - Sequential and overlapping inserts
//! - Covering-or-next lookups
//! - Contiguous run extraction
//! - Truncation
//!
//! Run with: cargo bench -p indras-sparse-buffer

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use indras_sparse_buffer::{BufferMapConfig, SparseBufferMap};

// ============================================================================
// Helper Functions
// ============================================================================

fn bench_config(threshold: usize) -> BufferMapConfig {
    BufferMapConfig::with_threshold(threshold).with_verify_invariants(false)
}

/// Map holding `count` segments of `size` bytes separated by gaps of `size`
fn gapped_map(count: usize, size: usize) -> SparseBufferMap {
    let mut map = SparseBufferMap::new(bench_config(usize::MAX));
    let chunk = vec![0xABu8; size];
    for i in 0..count {
        map.insert((i * size * 2) as u64, &chunk).unwrap();
    }
    map
}

/// Map holding `count` adjacent segments of `size` bytes
fn adjacent_map(count: usize, size: usize) -> SparseBufferMap {
    let mut map = SparseBufferMap::new(bench_config(usize::MAX));
    let chunk = vec![0xCDu8; size];
    for i in 0..count {
        map.insert((i * size) as u64, &chunk).unwrap();
    }
    map
}

// ============================================================================
// Insert Benchmarks
// ============================================================================

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    let chunk = vec![0x5Au8; 4096];

    group.bench_function("sequential_4k_x256", |b| {
        b.iter(|| {
            let mut map = SparseBufferMap::new(bench_config(usize::MAX));
            for i in 0..256u64 {
                map.insert(black_box(i * 4096), black_box(&chunk)).unwrap();
            }
            map
        })
    });

    group.bench_function("overwrite_in_place_4k", |b| {
        let mut map = adjacent_map(256, 4096);
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 1) % 255;
            map.insert(black_box(i * 4096 + 100), black_box(&chunk)).unwrap();
        })
    });

    group.bench_function("fill_gaps_across_64_segments", |b| {
        let data = vec![0x11u8; 64 * 2 * 512];
        b.iter_batched(
            || gapped_map(64, 512),
            |mut map| {
                map.insert(0, black_box(&data)).unwrap();
                map
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

// ============================================================================
// Lookup Benchmarks
// ============================================================================

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let map = gapped_map(10_000, 512);

    group.bench_function("covering_10k_segments", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 7919) % 10_000;
            map.lookup(black_box(i * 1024 + 10))
        })
    });

    group.bench_function("next_10k_segments", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 7919) % 10_000;
            map.lookup(black_box(i * 1024 + 600))
        })
    });

    group.finish();
}

// ============================================================================
// Extraction Benchmarks
// ============================================================================

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    group.bench_function("forced_run_of_256_segments", |b| {
        b.iter_batched(
            || adjacent_map(256, 4096),
            |mut map| map.extract_contiguous_run(black_box(true)).unwrap(),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("scan_1k_runs_below_threshold", |b| {
        let mut map = gapped_map(1_000, 512);
        b.iter(|| map.extract_contiguous_run(black_box(false)).unwrap())
    });

    group.finish();
}

// ============================================================================
// Truncate Benchmarks
// ============================================================================

fn bench_truncate(c: &mut Criterion) {
    let mut group = c.benchmark_group("truncate");

    group.bench_function("truncate_half_of_1k_segments", |b| {
        b.iter_batched(
            || gapped_map(1_000, 512),
            |mut map| {
                map.truncate(black_box(500 * 1024 + 256));
                map
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_lookup,
    bench_extract,
    bench_truncate,
);

criterion_main!(benches);
