//! CAS store implementation

use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use quarry_core::QuarryError;
use tracing::{debug, warn};

use super::hash::compute_hash;
use super::{CasEntry, CasIndex, ContentHash};
use crate::StoreResult;

const INDEX_FILE: &str = "index.json";

/// Content-addressable storage
#[derive(Debug)]
pub struct CasStore {
    /// Root directory for storage (`<repository>/store`)
    root_path: Utf8PathBuf,
    index: CasIndex,
}

impl CasStore {
    pub fn new<P: AsRef<Utf8Path>>(root_path: P) -> StoreResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        fs::create_dir_all(&root_path)
            .map_err(|e| QuarryError::io("Failed to create store directory".to_string(), e))?;

        let index = CasIndex::load_or_create(root_path.join(INDEX_FILE))?;

        Ok(Self { root_path, index })
    }

    /// Storage path for a hash: `ab/cd/abcd...`
    pub fn path_of(&self, hash: &ContentHash) -> Utf8PathBuf {
        let hex = hash.to_hex();
        self.root_path.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.path_of(hash).exists()
    }

    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    pub fn index(&self) -> &CasIndex {
        &self.index
    }

    /// Store content and return its hash; storing twice is a no-op
    pub fn store(&self, content: &[u8]) -> StoreResult<ContentHash> {
        let hash = compute_hash(content);
        let path = self.path_of(&hash);

        if path.exists() {
            if self.index.get(&hash).is_none() {
                self.index.insert(CasEntry::new(hash, content.len() as u64));
            }
            return Ok(hash);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QuarryError::io("Failed to create content directory".to_string(), e))?;
        }

        // Write then rename so a crash never leaves a truncated blob under its hash
        let partial = path.with_extension("partial");
        fs::write(&partial, content)
            .map_err(|e| QuarryError::io("Failed to write content file".to_string(), e))?;
        fs::rename(&partial, &path)
            .map_err(|e| QuarryError::io("Failed to move content into place".to_string(), e))?;

        self.index.insert(CasEntry::new(hash, content.len() as u64));
        debug!(%hash, size = content.len(), "stored content");

        Ok(hash)
    }

    pub fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let path = self.path_of(hash);
        if !path.exists() {
            return Err(QuarryError::NotFound {
                url: path.to_string(),
            });
        }

        fs::read(&path).map_err(|e| QuarryError::io("Failed to read content file".to_string(), e))
    }

    /// Check that stored content still hashes to its address
    pub fn verify(&self, hash: &ContentHash) -> StoreResult<bool> {
        match self.get(hash) {
            Ok(content) => Ok(compute_hash(&content) == *hash),
            Err(QuarryError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn save_index(&self) -> StoreResult<()> {
        self.index.save()
    }

    /// Remove every indexed blob not in `referenced`
    pub fn garbage_collect(&self, referenced: &HashSet<ContentHash>) -> StoreResult<GcResult> {
        let mut result = GcResult::default();

        for hash in self.index.hashes() {
            if referenced.contains(&hash) {
                continue;
            }

            let path = self.path_of(&hash);
            if let Ok(metadata) = fs::metadata(&path) {
                result.freed_space += metadata.len();
            }
            match fs::remove_file(&path) {
                Ok(()) => {},
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => {
                    warn!(%path, error = %e, "failed to remove unreferenced content");
                    continue;
                },
            }

            // Shard directories are removed only once empty
            if let Some(parent) = path.parent() {
                let _ = fs::remove_dir(parent);
                if let Some(grandparent) = parent.parent() {
                    let _ = fs::remove_dir(grandparent);
                }
            }

            self.index.remove(&hash);
            result.entries_removed += 1;
        }

        self.save_index()?;
        Ok(result)
    }
}

/// Result of a garbage collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcResult {
    pub entries_removed: usize,
    /// Bytes freed
    pub freed_space: u64,
}

impl GcResult {
    /// Freed space in human-readable form
    pub fn format_freed_space(&self) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = self.freed_space as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", self.freed_space, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(temp_dir: &tempfile::TempDir) -> CasStore {
        let store_path = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        CasStore::new(store_path).unwrap()
    }

    #[test]
    fn test_store_and_retrieve() {
        let temp_dir = tempdir().unwrap();
        let store = store_in(&temp_dir);

        let hash = store.store(b"hello world").unwrap();
        assert_eq!(store.get(&hash).unwrap(), b"hello world");
        assert!(store.contains(&hash));
        assert!(store.verify(&hash).unwrap());
        assert!(store.path_of(&hash).as_str().ends_with(&format!("b9/4d/{}", hash)));
    }

    #[test]
    fn test_duplicate_store() {
        let temp_dir = tempdir().unwrap();
        let store = store_in(&temp_dir);

        let first = store.store(b"hello world").unwrap();
        let second = store.store(b"hello world").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.index().len(), 1);
    }

    #[test]
    fn test_missing_content() {
        let temp_dir = tempdir().unwrap();
        let store = store_in(&temp_dir);
        let missing = compute_hash(b"never stored");

        assert!(!store.contains(&missing));
        assert!(matches!(store.get(&missing), Err(QuarryError::NotFound { .. })));
        assert!(!store.verify(&missing).unwrap());
    }

    #[test]
    fn test_tampered_content_fails_verification() {
        let temp_dir = tempdir().unwrap();
        let store = store_in(&temp_dir);
        let hash = store.store(b"original").unwrap();

        fs::write(store.path_of(&hash), b"tampered").unwrap();
        assert!(!store.verify(&hash).unwrap());
    }

    #[test]
    fn test_garbage_collection() {
        let temp_dir = tempdir().unwrap();
        let store = store_in(&temp_dir);

        let keep = store.store(b"keep me").unwrap();
        let drop = store.store(b"drop me").unwrap();

        let referenced: HashSet<ContentHash> = [keep].into_iter().collect();
        let result = store.garbage_collect(&referenced).unwrap();

        assert_eq!(result.entries_removed, 1);
        assert_eq!(result.freed_space, 7);
        assert!(store.contains(&keep));
        assert!(!store.contains(&drop));
        assert!(store.index().get(&drop).is_none());
    }

    #[test]
    fn test_gc_result_formatting() {
        let small = GcResult {
            entries_removed: 1,
            freed_space: 512,
        };
        assert_eq!(small.format_freed_space(), "512 B");

        let result = GcResult {
            entries_removed: 5,
            freed_space: 1536,
        };
        assert_eq!(result.format_freed_space(), "1.5 KB");
    }
}
