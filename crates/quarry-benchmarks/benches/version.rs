//! Version ordering and requirement matching benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quarry_benchmarks::{criterion_config, version_strings};
use quarry_core::{compare, Requirement, Version};

fn bench_compare(c: &mut Criterion) {
    let versions = version_strings(1_000);

    c.bench_function("compare_pairs", |b| {
        b.iter(|| {
            versions
                .windows(2)
                .map(|pair| compare(black_box(&pair[0]), black_box(&pair[1])))
                .count()
        })
    });
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_versions");
    for size in [100, 1_000, 10_000] {
        let versions: Vec<Version> = version_strings(size).into_iter().map(Version::new).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &versions, |b, versions| {
            b.iter(|| {
                let mut sorted = versions.clone();
                sorted.sort();
                black_box(sorted)
            })
        });
    }
    group.finish();
}

fn bench_requirement(c: &mut Criterion) {
    let versions = version_strings(1_000);
    let requirement = Requirement::parse(">= 2.1&< 5").expect("valid requirement");

    c.bench_function("requirement_parse", |b| {
        b.iter(|| Requirement::parse(black_box(">= 1.2.3&< 2&>= 1.5.rc1")))
    });
    c.bench_function("requirement_match", |b| {
        b.iter(|| {
            versions
                .iter()
                .filter(|version| requirement.matches(black_box(version)))
                .count()
        })
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_compare, bench_sort, bench_requirement
}
criterion_main!(benches);
