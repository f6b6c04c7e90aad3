//! Repository versions.
//!
//! The inventory is the content set of the latest repository version. A
//! commit writes the next version to a temporary file and renames it over
//! the previous one, so readers only ever see a complete version.

use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use quarry_core::{PackageKey, PackageRecord, QuarryError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cas::{compute_hash, CasStore, ContentHash};
use crate::StoreResult;

const INVENTORY_FILE: &str = "inventory.json";
const STORE_DIR: &str = "store";

/// One file belonging to a package, addressed by its published path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub relative_path: String,
    /// `None` until the artifact has been downloaded (on-demand content)
    pub sha256: Option<ContentHash>,
}

impl StoredArtifact {
    pub fn new(relative_path: impl Into<String>, sha256: Option<ContentHash>) -> Self {
        Self {
            relative_path: relative_path.into(),
            sha256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub record: PackageRecord,
    pub artifacts: Vec<StoredArtifact>,
}

impl ContentUnit {
    pub fn new(record: PackageRecord, artifacts: Vec<StoredArtifact>) -> Self {
        Self { record, artifacts }
    }

    pub fn key(&self) -> PackageKey {
        self.record.key()
    }

    /// Whether every artifact has been downloaded into the store
    pub fn is_stored(&self) -> bool {
        self.artifacts.iter().all(|artifact| artifact.sha256.is_some())
    }

    fn artifact_at(&self, relative_path: &str) -> Option<&StoredArtifact> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.relative_path == relative_path)
    }

    /// The `.gem` archive artifact
    pub fn archive(&self) -> Option<&StoredArtifact> {
        self.artifact_at(&self.record.gem_path())
    }

    /// The `quick/Marshal.4.8` gemspec artifact
    pub fn gemspec(&self) -> Option<&StoredArtifact> {
        self.artifact_at(&self.record.gemspec_path())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// 0 for a repository that has never been committed
    pub version: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub units: Vec<ContentUnit>,
}

impl Inventory {
    /// Load an inventory file; a missing file is the empty version 0
    pub fn load(path: &Utf8Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| QuarryError::io(format!("Failed to read {}", path), e))?;
        serde_json::from_str(&content)
            .map_err(|e| QuarryError::codec(format!("corrupt inventory {}: {}", path, e)))
    }

    /// Write atomically: temporary file, then rename
    pub fn save(&self, path: &Utf8Path) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            QuarryError::io(
                format!("Failed to serialize inventory: {}", e),
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;

        let temp = path.with_extension("json.tmp");
        fs::write(&temp, content)
            .map_err(|e| QuarryError::io(format!("Failed to write {}", temp), e))?;
        fs::rename(&temp, path)
            .map_err(|e| QuarryError::io(format!("Failed to commit {}", path), e))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn find(&self, key: &PackageKey) -> Option<&ContentUnit> {
        self.units.iter().find(|unit| &unit.key() == key)
    }

    pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
        self.units.iter().map(|unit| &unit.record)
    }

    /// Every stored blob this version points at
    pub fn referenced_hashes(&self) -> HashSet<ContentHash> {
        self.units
            .iter()
            .flat_map(|unit| unit.artifacts.iter())
            .filter_map(|artifact| artifact.sha256)
            .collect()
    }
}

/// A repository on disk: the CAS plus the committed inventory
#[derive(Debug)]
pub struct Repository {
    root: Utf8PathBuf,
    cas: CasStore,
}

impl Repository {
    /// Open (creating if needed) a repository rooted at `root`
    pub fn open<P: AsRef<Utf8Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        let cas = CasStore::new(root.join(STORE_DIR))?;
        Ok(Self { root, cas })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn cas(&self) -> &CasStore {
        &self.cas
    }

    fn inventory_path(&self) -> Utf8PathBuf {
        self.root.join(INVENTORY_FILE)
    }

    /// The latest committed version
    pub fn inventory(&self) -> StoreResult<Inventory> {
        Inventory::load(&self.inventory_path())
    }

    /// Store an archive and its gemspec, returning the unit that references them
    pub fn import(
        &self,
        record: PackageRecord,
        archive: &[u8],
        gemspec: &[u8],
    ) -> StoreResult<ContentUnit> {
        // Nothing is written until the archive matches its record
        let actual = compute_hash(archive);
        if actual.to_hex() != record.checksum.to_ascii_lowercase() {
            return Err(QuarryError::IntegrityFailure {
                artifact: record.gem_path(),
                expected: record.checksum.clone(),
                actual: actual.to_hex(),
            });
        }
        let archive_hash = self.cas.store(archive)?;
        let gemspec_hash = self.cas.store(gemspec)?;

        let artifacts = vec![
            StoredArtifact::new(record.gem_path(), Some(archive_hash)),
            StoredArtifact::new(record.gemspec_path(), Some(gemspec_hash)),
        ];
        Ok(ContentUnit::new(record, artifacts))
    }

    /// Commit `units` as the next repository version
    pub fn commit(&self, mut units: Vec<ContentUnit>) -> StoreResult<Inventory> {
        let current = self.inventory()?;
        units.sort_by_key(ContentUnit::key);

        let next = Inventory {
            version: current.version + 1,
            created_at: Some(Utc::now()),
            units,
        };

        self.cas.save_index()?;
        next.save(&self.inventory_path())?;
        info!(version = next.version, units = next.len(), "committed repository version");

        Ok(next)
    }
}
