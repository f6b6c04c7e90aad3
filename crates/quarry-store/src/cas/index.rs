//! CAS index for stored content metadata

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use quarry_core::QuarryError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ContentHash;
use crate::StoreResult;

/// Metadata for one stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasEntry {
    pub hash: ContentHash,
    /// Size in bytes
    pub size: u64,
    pub stored_at: DateTime<Utc>,
}

impl CasEntry {
    pub fn new(hash: ContentHash, size: u64) -> Self {
        Self {
            hash,
            size,
            stored_at: Utc::now(),
        }
    }
}

/// Index of stored blobs, persisted as JSON next to the content
#[derive(Debug)]
pub struct CasIndex {
    entries: DashMap<ContentHash, CasEntry>,
    index_path: PathBuf,
}

impl CasIndex {
    /// Load an existing index or start an empty one.
    ///
    /// A corrupt index is discarded; the blobs themselves stay authoritative.
    pub fn load_or_create<P: AsRef<Path>>(index_path: P) -> StoreResult<Self> {
        let index_path = index_path.as_ref().to_path_buf();
        let entries = DashMap::new();

        if index_path.exists() {
            let content = fs::read_to_string(&index_path)
                .map_err(|e| QuarryError::io("Failed to read CAS index".to_string(), e))?;
            match serde_json::from_str::<Vec<CasEntry>>(&content) {
                Ok(loaded) => {
                    for entry in loaded {
                        entries.insert(entry.hash, entry);
                    }
                },
                Err(e) => warn!(path = %index_path.display(), error = %e, "discarding corrupt CAS index"),
            }
        }

        Ok(Self {
            entries,
            index_path,
        })
    }

    pub fn insert(&self, entry: CasEntry) {
        self.entries.insert(entry.hash, entry);
    }

    pub fn get(&self, hash: &ContentHash) -> Option<CasEntry> {
        self.entries.get(hash).map(|entry| entry.clone())
    }

    pub fn remove(&self, hash: &ContentHash) -> Option<CasEntry> {
        self.entries.remove(hash).map(|(_, entry)| entry)
    }

    pub fn hashes(&self) -> Vec<ContentHash> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the index to disk, sorted by hash so the file is stable
    pub fn save(&self) -> StoreResult<()> {
        let mut entries: Vec<CasEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.hash.cmp(&b.hash));

        let content = serde_json::to_string_pretty(&entries).map_err(|e| {
            QuarryError::io(
                format!("Failed to serialize CAS index: {}", e),
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;

        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QuarryError::io("Failed to create index directory".to_string(), e))?;
        }
        fs::write(&self.index_path, content)
            .map_err(|e| QuarryError::io("Failed to write CAS index".to_string(), e))?;

        Ok(())
    }
}
