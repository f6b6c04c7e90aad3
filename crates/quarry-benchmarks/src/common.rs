//! Shared fixtures for benchmarks

use std::time::Duration;

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use quarry_core::PackageRecord;
use quarry_index::GemBuilder;
use quarry_store::{ContentUnit, Repository};

/// Criterion with flamegraph profiling
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(2))
        .measurement_time(Duration::from_secs(8))
        .sample_size(50)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// `count` version strings mixing release, prerelease and padded forms
pub fn version_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!("{}.{}.{}", i % 7, i % 13, i % 5),
            1 => format!("{}.{}.0.rc{}", i % 7, i % 11, i % 3),
            2 => format!("{}.{}", i % 9, i % 17),
            _ => format!("{}.{}.{}.beta.{}", i % 3, i % 5, i % 7, i % 2),
        })
        .collect()
}

/// Synthetic records: `names` gems with `versions` releases each
pub fn records(names: usize, versions: usize) -> Vec<PackageRecord> {
    let mut out = Vec::with_capacity(names * versions);
    for n in 0..names {
        for v in 0..versions {
            let platform = if v % 5 == 4 { "java" } else { "ruby" };
            let record = PackageRecord::new(
                format!("gem{}", n),
                format!("{}.{}.0", v / 10, v % 10),
                platform,
                format!("{:064x}", n * versions + v),
            )
            .expect("valid synthetic record");
            out.push(record);
        }
    }
    out
}

/// A committed repository holding `count` small gems
pub fn populated_repository(root: &camino::Utf8Path, count: usize) -> Repository {
    let repository = Repository::open(root).expect("open repository");
    let registry = quarry_index::ClassRegistry::rubygems();
    let units: Vec<ContentUnit> = (0..count)
        .map(|i| {
            let archive = GemBuilder::new(format!("gem{}", i % 20), format!("1.{}.0", i))
                .dependency("rake", ">= 13")
                .build()
                .expect("build gem");
            let extracted = quarry_index::extract(&archive, &registry).expect("extract gem");
            repository
                .import(extracted.record, &archive, &extracted.gemspec)
                .expect("import gem")
        })
        .collect();
    repository.commit(units).expect("commit");
    repository
}
