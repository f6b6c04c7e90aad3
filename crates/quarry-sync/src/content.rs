//! Declarative content units.
//!
//! A unit describes a package the remote offers and where to get its two
//! artifacts. Nothing is downloaded or persisted here.

use quarry_core::utils::ExpectedDigest;
use quarry_core::{PackageKey, PackageRecord};
use quarry_registry::join_url;
use url::Url;

use crate::SyncResult;

/// One remote file belonging to a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarativeArtifact {
    /// Published path, relative to the repository root
    pub relative_path: String,
    pub url: Url,
    /// Archives are pinned by their checksum; gemspecs are not
    pub expected: Option<ExpectedDigest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarativeContent {
    pub record: PackageRecord,
    /// The archive followed by its gemspec
    pub artifacts: Vec<DeclarativeArtifact>,
    /// Artifacts are fetched on first request instead of during the sync
    pub deferred: bool,
}

impl DeclarativeContent {
    /// Describe `record` as served from the repository at `remote`
    pub fn from_record(record: PackageRecord, remote: &Url, deferred: bool) -> SyncResult<Self> {
        let archive_path = record.gem_path();
        let gemspec_path = record.gemspec_path();

        let artifacts = vec![
            DeclarativeArtifact {
                url: join_url(remote, &archive_path)?,
                relative_path: archive_path,
                expected: Some(ExpectedDigest::Sha256(record.checksum.clone())),
            },
            DeclarativeArtifact {
                url: join_url(remote, &gemspec_path)?,
                relative_path: gemspec_path,
                expected: None,
            },
        ];

        Ok(Self {
            record,
            artifacts,
            deferred,
        })
    }

    pub fn key(&self) -> PackageKey {
        self.record.key()
    }

    /// Identity used for reconciliation: the key plus the archive checksum
    pub fn identity(&self) -> (PackageKey, String) {
        (self.key(), self.record.checksum.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_record() {
        let record = PackageRecord::new("nokogiri", "1.16.0", "x86_64-linux", "ABC").unwrap();
        let remote = Url::parse("https://rubygems.org").unwrap();
        let content = DeclarativeContent::from_record(record, &remote, false).unwrap();

        assert_eq!(content.artifacts.len(), 2);
        let archive = &content.artifacts[0];
        assert_eq!(archive.relative_path, "gems/nokogiri-1.16.0-x86_64-linux.gem");
        assert_eq!(
            archive.url.as_str(),
            "https://rubygems.org/gems/nokogiri-1.16.0-x86_64-linux.gem"
        );
        assert_eq!(archive.expected, Some(ExpectedDigest::Sha256("ABC".to_string())));

        let gemspec = &content.artifacts[1];
        assert_eq!(
            gemspec.url.as_str(),
            "https://rubygems.org/quick/Marshal.4.8/nokogiri-1.16.0-x86_64-linux.gemspec.rz"
        );
        assert!(gemspec.expected.is_none());

        assert_eq!(content.identity().1, "abc");
    }
}
