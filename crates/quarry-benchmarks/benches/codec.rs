//! Marshal and compact index codec benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quarry_benchmarks::{criterion_config, records};
use quarry_core::PackageKey;
use quarry_index::compact::{decode_info, decode_versions, encode_info, encode_versions};
use quarry_index::{extract, specs, ClassRegistry, GemBuilder, VersionsEntry};

fn bench_specs(c: &mut Criterion) {
    let registry = ClassRegistry::rubygems();
    let mut group = c.benchmark_group("specs");

    for size in [1_000, 10_000] {
        let keys: Vec<PackageKey> = records(size / 10, 10).iter().map(|r| r.key()).collect();
        let encoded = specs::encode(&keys);
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &keys, |b, keys| {
            b.iter(|| specs::encode(black_box(keys)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, bytes| {
            b.iter(|| specs::decode(black_box(bytes), &registry).expect("decode specs"))
        });
    }
    group.finish();
}

fn bench_compact(c: &mut Criterion) {
    let records = records(1, 500);
    let info = encode_info(&records);

    let entries: Vec<VersionsEntry> = (0..5_000)
        .map(|i| {
            VersionsEntry::new(
                format!("gem{}", i),
                vec!["1.0.0".to_string(), "1.1.0".to_string(), "2.0.0-java".to_string()],
                Some(format!("{:032x}", i)),
            )
        })
        .collect();
    let versions = encode_versions(&entries, None);

    c.bench_function("info_encode", |b| b.iter(|| encode_info(black_box(&records))));
    c.bench_function("info_decode", |b| {
        b.iter(|| decode_info("gem0", black_box(&info), None).expect("decode info"))
    });
    c.bench_function("versions_decode", |b| {
        b.iter(|| decode_versions(black_box(&versions)).expect("decode versions"))
    });
}

fn bench_extract(c: &mut Criterion) {
    let registry = ClassRegistry::rubygems();
    let archive = GemBuilder::new("mygem", "1.2.3")
        .dependency("rake", ">= 13&< 14")
        .dependency("rack", ">= 3.0")
        .required_ruby_version(">= 3.0")
        .file("lib/mygem.rb", &vec![b'#'; 64 * 1024])
        .build()
        .expect("build gem");

    c.bench_function("extract_gem", |b| {
        b.iter(|| extract(black_box(&archive), &registry).expect("extract"))
    });
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_specs, bench_compact, bench_extract
}
criterion_main!(benches);
