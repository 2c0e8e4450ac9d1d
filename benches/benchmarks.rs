//! Benchmarks for compression, random access, and decompression.
//!
//! Run with: `cargo bench`
//!
//! Criterion automatically saves baselines, so you can compare against
//! previous commits by running benchmarks before and after changes.
//! Use `cargo bench -- --save-baseline <name>` and `cargo bench -- --baseline <name>`
//! for explicit baseline management.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use neats_rs::NeatsCompressor;
use std::hint::black_box;

fn lcg(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Smooth trend with small jitter: the friendly case for model fitting.
fn generate_sensor_data(size: usize) -> Vec<i64> {
    let mut state = 0xA5A5_5A5Au64;
    (0..size)
        .map(|i| 50 * i as i64 + ((lcg(&mut state) >> 59) as i64 - 16))
        .collect()
}

/// Piecewise trends with occasional level shifts.
fn generate_shifting_data(size: usize) -> Vec<i64> {
    let mut state = 17u64;
    let mut level = 0i64;
    (0..size)
        .map(|i| {
            if i % 1000 == 0 {
                level += (lcg(&mut state) >> 48) as i64 - 32_768;
            }
            level + 7 * (i % 1000) as i64 + ((lcg(&mut state) >> 61) as i64)
        })
        .collect()
}

/// Wide uniform noise: the adversarial case, segments collapse.
fn generate_noise_data(size: usize) -> Vec<i64> {
    let mut state = 0xFEED_F00Du64;
    (0..size)
        .map(|_| (lcg(&mut state) >> 16) as i64 % 1_000_000_000)
        .collect()
}

fn build(data: &[i64], bpc: u8) -> NeatsCompressor {
    let mut c = NeatsCompressor::new(bpc).unwrap();
    c.partition(data).unwrap();
    c
}

// ============================================================================
// Core build/decompress benchmarks
// ============================================================================

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for size in [10_000, 100_000] {
        let data = generate_sensor_data(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                let mut c = NeatsCompressor::new(8).unwrap();
                c.partition(black_box(data)).unwrap();
                c
            })
        });
    }

    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");

    for size in [10_000, 100_000] {
        let data = generate_sensor_data(size);
        let compressor = build(&data, 8);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("scalar", size),
            &compressor,
            |b, compressor| {
                b.iter(|| {
                    let mut out = vec![0i64; compressor.size()];
                    compressor.decompress(black_box(&mut out));
                    out
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("simd", size),
            &compressor,
            |b, compressor| {
                b.iter(|| {
                    let mut out = vec![0i64; compressor.size()];
                    compressor.simd_decompress(black_box(&mut out));
                    out
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Access-path benchmarks
// ============================================================================

fn bench_value_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_at");

    let data = generate_shifting_data(100_000);
    let compressor = build(&data, 10);

    let mut state = 2323u64;
    let queries: Vec<usize> = (0..10_000)
        .map(|_| (lcg(&mut state) % data.len() as u64) as usize)
        .collect();

    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("random", |b| {
        b.iter(|| {
            let mut acc = 0i64;
            for &i in &queries {
                acc = acc.wrapping_add(compressor.value_at(black_box(i)));
            }
            acc
        })
    });

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");

    let data = generate_shifting_data(100_000);
    let compressor = build(&data, 10);

    for range in [100usize, 10_000] {
        group.throughput(Throughput::Elements(range as u64));
        group.bench_with_input(BenchmarkId::from_parameter(range), &range, |b, &range| {
            let mut out = vec![0i64; range];
            let lo = data.len() / 3;
            b.iter(|| {
                compressor.scan(black_box(lo), black_box(lo + range), &mut out);
                out[range / 2]
            })
        });
    }

    group.finish();
}

// ============================================================================
// Data pattern / width sweeps
// ============================================================================

fn bench_data_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_patterns");
    let size = 50_000;

    let sensor = generate_sensor_data(size);
    let shifting = generate_shifting_data(size);
    let noise = generate_noise_data(size);

    group.throughput(Throughput::Elements(size as u64));
    for (name, data) in [
        ("sensor", &sensor),
        ("shifting", &shifting),
        ("noise", &noise),
    ] {
        group.bench_with_input(BenchmarkId::new("partition", name), data, |b, data| {
            b.iter(|| {
                let mut c = NeatsCompressor::new(10).unwrap();
                c.partition(black_box(data)).unwrap();
                c
            })
        });
    }

    group.finish();
}

fn bench_compression_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_analysis");

    let data = generate_shifting_data(50_000);
    for bpc in [4u8, 8, 12, 16] {
        let compressor = build(&data, bpc);
        let ratio = compressor.size_in_bits() as f64 / (data.len() * 64) as f64;
        println!(
            "bpc {}: {} segments, ratio {:.3}",
            bpc,
            compressor.segment_count(),
            ratio
        );

        group.throughput(Throughput::Elements(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("bpc_{}", bpc)),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut c = NeatsCompressor::new(bpc).unwrap();
                    c.partition(black_box(data)).unwrap();
                    c
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_partition,
    bench_decompress,
    bench_value_at,
    bench_scan,
    bench_data_patterns,
    bench_compression_ratio,
);

criterion_main!(benches);
