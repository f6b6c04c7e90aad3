//! Regenerates every index artifact of a repository version.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use quarry_core::utils::md5_hex;
use quarry_core::{PackageRecord, QuarryError};
use quarry_index::compact::{encode_info, encode_names, encode_versions, VersionsEntry};
use quarry_index::compress::gzip;
use quarry_index::specs;
use quarry_store::{Inventory, LinkResult, Linker, Repository};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::latest::{keys, latest_per_platform, partition, sort_records};
use crate::listing::Listing;
use crate::publication::Publication;
use crate::PublishResult;

const SPECS: &str = "specs.4.8";
const LATEST_SPECS: &str = "latest_specs.4.8";
const PRERELEASE_SPECS: &str = "prerelease_specs.4.8";

const ROOT_LINKS: &[&str] = &[
    "gems/",
    "quick/Marshal.4.8/",
    SPECS,
    LATEST_SPECS,
    PRERELEASE_SPECS,
    "names",
    "names.list",
    "versions",
    "versions.list",
    "info/",
];

/// Summary of a committed publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub output: Utf8PathBuf,
    /// Inventory version that was published
    pub version: u64,
    pub packages: usize,
    pub names: usize,
    pub prereleases: usize,
    /// Entries in `latest_specs.4.8`
    pub latest: usize,
    pub linked: LinkResult,
    /// Artifacts indexed without a stored copy (on-demand content)
    pub missing_artifacts: usize,
}

pub struct Publisher<'a> {
    repository: &'a Repository,
    cancel: CancellationToken,
    created_at: Option<DateTime<Utc>>,
}

impl<'a> Publisher<'a> {
    pub fn new(repository: &'a Repository) -> Self {
        Self {
            repository,
            cancel: CancellationToken::new(),
            created_at: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fix the `versions` timestamp instead of using the current time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Publish the latest inventory into `output`, replacing it on success
    pub fn publish(&self, output: &Utf8Path) -> PublishResult<PublishReport> {
        let inventory = self.repository.inventory()?;
        info!(version = inventory.version, units = inventory.len(), %output, "publishing");

        let mut publication = Publication::begin(output)?;
        let mut report = self.write_all(&inventory, &mut publication)?;
        self.check_cancelled()?;
        report.output = publication.commit()?;

        info!(
            packages = report.packages,
            names = report.names,
            linked = report.linked.total(),
            "publication committed"
        );
        Ok(report)
    }

    fn write_all(
        &self,
        inventory: &Inventory,
        publication: &mut Publication,
    ) -> PublishResult<PublishReport> {
        let mut records: Vec<&PackageRecord> = inventory.records().collect();
        sort_records(&mut records);

        let split = partition(records.iter().copied());
        let latest = latest_per_platform(&split.stable);
        for (file, entries) in [
            (SPECS, &split.stable),
            (LATEST_SPECS, &latest),
            (PRERELEASE_SPECS, &split.prerelease),
        ] {
            let bytes = specs::encode(&keys(entries));
            publication.write(file, &bytes)?;
            publication.write(&format!("{}.gz", file), &gzip(&bytes)?)?;
        }
        self.check_cancelled()?;

        let groups = group_by_name(&records);
        let names: Vec<&str> = groups.iter().map(|(name, _)| *name).collect();
        publication.write_with_list("names", encode_names(&names).as_bytes())?;

        // info/<name> must exist before its digest goes into `versions`
        let infos: Vec<(&str, String)> = groups
            .par_iter()
            .map(|(name, group)| {
                self.check_cancelled()?;
                Ok((*name, encode_info(group.iter().copied())))
            })
            .collect::<PublishResult<_>>()?;

        let mut entries = Vec::with_capacity(infos.len());
        for ((name, info), (_, group)) in infos.iter().zip(&groups) {
            publication.write(&format!("info/{}", name), info.as_bytes())?;
            entries.push(VersionsEntry::new(
                *name,
                group.iter().map(|record| record.ext_version()).collect(),
                Some(md5_hex(info.as_bytes())),
            ));
        }
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        publication.write_with_list("versions", encode_versions(&entries, Some(&created_at)).as_bytes())?;
        self.check_cancelled()?;

        let (linked, missing_artifacts) = self.link_artifacts(inventory, publication)?;
        self.write_listings(&records, &names, publication)?;

        Ok(PublishReport {
            output: publication.target().to_path_buf(),
            version: inventory.version,
            packages: records.len(),
            names: names.len(),
            prereleases: split.prerelease.len(),
            latest: latest.len(),
            linked,
            missing_artifacts,
        })
    }

    fn link_artifacts(
        &self,
        inventory: &Inventory,
        publication: &Publication,
    ) -> PublishResult<(LinkResult, usize)> {
        let cas = self.repository.cas();
        let linker = Linker::new(cas);
        let mut linked = LinkResult::default();
        let mut missing = 0;

        for artifact in inventory.units.iter().flat_map(|unit| &unit.artifacts) {
            match artifact.sha256.as_ref().filter(|hash| cas.contains(hash)) {
                Some(hash) => {
                    let dest = publication.path_for(&artifact.relative_path)?;
                    linker.link(hash, &dest, &mut linked)?;
                },
                None => {
                    debug!(path = %artifact.relative_path, "artifact not stored, indexed only");
                    missing += 1;
                },
            }
        }
        Ok((linked, missing))
    }

    fn write_listings(
        &self,
        records: &[&PackageRecord],
        names: &[&str],
        publication: &mut Publication,
    ) -> PublishResult<()> {
        let gems = records
            .iter()
            .map(|record| format!("{}.gem", record.key().full_name()))
            .collect();
        let gemspecs = records
            .iter()
            .map(|record| format!("{}.gemspec.rz", record.key().full_name()))
            .collect();

        let listings = [
            Listing::new("", ROOT_LINKS.iter().map(|link| link.to_string()).collect()),
            Listing::new("gems/", gems),
            Listing::new("quick/", vec!["Marshal.4.8/".to_string()]),
            Listing::new("quick/Marshal.4.8/", gemspecs),
            Listing::new("info/", names.iter().map(|name| name.to_string()).collect()),
        ];
        for listing in &listings {
            publication.write(&listing.file_path(), listing.render_page()?.as_bytes())?;
        }
        Ok(())
    }

    fn check_cancelled(&self) -> PublishResult<()> {
        if self.cancel.is_cancelled() {
            Err(QuarryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Publish the latest version of `repository` into `output`
pub fn publish(repository: &Repository, output: &Utf8Path) -> PublishResult<PublishReport> {
    Publisher::new(repository).publish(output)
}

/// Consecutive runs of sorted records sharing a name
fn group_by_name<'r>(records: &[&'r PackageRecord]) -> Vec<(&'r str, Vec<&'r PackageRecord>)> {
    let mut groups: Vec<(&'r str, Vec<&'r PackageRecord>)> = Vec::new();
    for &record in records {
        match groups.last_mut() {
            Some((name, group)) if *name == record.name => group.push(record),
            _ => groups.push((record.name.as_str(), vec![record])),
        }
    }
    groups
}
