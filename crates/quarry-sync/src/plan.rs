//! Name and version selection over the remote `versions` file.
//!
//! Per name, in order: name validity, inclusion filter, exclusion filter,
//! prerelease policy, version validity. Names with nothing left are dropped
//! so their `info` file is never fetched.

use quarry_core::types::{is_prerelease, is_valid_name, is_valid_version};
use quarry_core::split_ext_version;
use quarry_index::VersionsEntry;
use tracing::{debug, warn};

use crate::options::SyncOptions;

/// What to fetch for one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePlan {
    pub name: String,
    /// Surviving external versions, in remote order
    pub ext_versions: Vec<String>,
    /// Digest of the remote `info/<name>` file, when published
    pub md5: Option<String>,
}

/// Apply the filters to one `versions` entry
pub fn select_versions(entry: &VersionsEntry, options: &SyncOptions) -> Option<NamePlan> {
    let name = entry.name.as_str();
    if !is_valid_name(name) {
        warn!(name, "skipping invalid gem name");
        return None;
    }

    let mut ext_versions: Vec<String> = entry.ext_versions.clone();

    if let Some(includes) = &options.includes {
        match includes.lookup(name) {
            None => return None,
            Some(None) => {},
            Some(Some(requirement)) => {
                ext_versions.retain(|ext| requirement.matches(split_ext_version(ext).0))
            },
        }
    }

    if let Some(excludes) = &options.excludes {
        match excludes.lookup(name) {
            None => {},
            Some(None) => {
                debug!(name, "excluded");
                return None;
            },
            Some(Some(requirement)) => {
                ext_versions.retain(|ext| !requirement.matches(split_ext_version(ext).0))
            },
        }
    }

    if !options.prereleases {
        ext_versions.retain(|ext| {
            let prerelease = is_prerelease(split_ext_version(ext).0);
            if prerelease {
                debug!(name, version = %ext, "dropping prerelease");
            }
            !prerelease
        });
    }

    ext_versions.retain(|ext| {
        let valid = is_valid_version(split_ext_version(ext).0);
        if !valid {
            warn!(name, version = %ext, "skipping invalid version");
        }
        valid
    });

    if ext_versions.is_empty() {
        debug!(name, "no versions selected");
        return None;
    }

    Some(NamePlan {
        name: name.to_string(),
        ext_versions,
        md5: entry.md5.clone(),
    })
}

/// Select across all entries, keeping remote order
pub fn plan_versions(entries: &[VersionsEntry], options: &SyncOptions) -> Vec<NamePlan> {
    entries
        .iter()
        .filter_map(|entry| select_versions(entry, options))
        .collect()
}
