//! Stable/prerelease partition and latest-version selection

use std::cmp::Ordering;

use indexmap::IndexMap;
use quarry_core::types::compare;
use quarry_core::{PackageKey, PackageRecord};

/// Records split by their prerelease flag, input order preserved
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub stable: Vec<&'a PackageRecord>,
    pub prerelease: Vec<&'a PackageRecord>,
}

pub fn partition<'a, I>(records: I) -> Partition<'a>
where
    I: IntoIterator<Item = &'a PackageRecord>,
{
    let mut split = Partition::default();
    for record in records {
        if record.prerelease {
            split.prerelease.push(record);
        } else {
            split.stable.push(record);
        }
    }
    split
}

/// Highest version for each `(name, platform)` in a single pass.
///
/// Groups appear in first-seen order.
pub fn latest_per_platform<'a>(stable: &[&'a PackageRecord]) -> Vec<&'a PackageRecord> {
    let mut latest: IndexMap<(&str, &str), &'a PackageRecord> = IndexMap::new();
    for &record in stable {
        let slot = latest
            .entry((record.name.as_str(), record.platform.as_str()))
            .or_insert(record);
        if compare(&slot.version, &record.version) == Ordering::Less {
            *slot = record;
        }
    }
    latest.into_values().collect()
}

/// Order by name, then version precedence, then platform
pub fn sort_records(records: &mut [&PackageRecord]) {
    records.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| compare(&a.version, &b.version))
            .then_with(|| a.platform.cmp(&b.platform))
    });
}

pub(crate) fn keys(records: &[&PackageRecord]) -> Vec<PackageKey> {
    records.iter().map(|record| record.key()).collect()
}
