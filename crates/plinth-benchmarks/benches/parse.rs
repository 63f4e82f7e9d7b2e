//! Parsing performance benchmarks
//!
//! Covers version and range literals, constraint lines, and JSON catalogs of
//! increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use plinth_benchmarks::{criterion_config, layered_catalog_json, CatalogShape};
use plinth_catalog::InMemoryCatalog;
use plinth_core::types::{ConstraintSource, Range, TargetConstraint, Version};

/// Benchmark version and range literal parsing
fn bench_literals(c: &mut Criterion) {
    let mut group = c.benchmark_group("literals");

    for input in ["1.0.0", "3.4.12.v20240101-1200"] {
        group.bench_with_input(BenchmarkId::new("version", input), input, |b, input| {
            b.iter(|| black_box(input.parse::<Version>().unwrap()))
        });
    }

    for input in ["1.2.0", "[1.2.0,2.0.0)", "(1.0.0.001,1.0.0.009]"] {
        group.bench_with_input(BenchmarkId::new("range", input), input, |b, input| {
            b.iter(|| black_box(input.parse::<Range>().unwrap()))
        });
    }

    group.finish();
}

/// Benchmark multi-line constraint text parsing
fn bench_constraint_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("constraint_lines");

    for count in [10usize, 100, 1000] {
        let text: String = (0..count)
            .map(|i| format!("com.bench.f{} [1.{}.0,2.0.0)\n# comment\n", i, i % 10))
            .collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| black_box(TargetConstraint::parse_lines(text, "bench").unwrap()))
        });
    }

    group.bench_function("single_line", |b| {
        let source = ConstraintSource::Url("bench".to_string());
        b.iter(|| black_box(TargetConstraint::parse_line("com.bench.f [1.0.0,2.0.0)", source.clone()).unwrap()))
    });

    group.finish();
}

/// Benchmark JSON catalog loading
fn bench_catalog_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_json");
    group.sample_size(20);

    for (depth, width) in [(2, 5), (4, 10), (6, 20)] {
        let shape = CatalogShape {
            depth,
            width,
            releases: 5,
            builds: 3,
        };
        let json = layered_catalog_json(shape);
        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_with_input(BenchmarkId::new("features", shape.feature_count()), &json, |b, json| {
            b.iter(|| black_box(InMemoryCatalog::from_json_str(json).unwrap()))
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_literals, bench_constraint_lines, bench_catalog_json
}
criterion_main!(benches);
