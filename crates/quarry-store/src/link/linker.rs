//! Linker implementation for hardlink operations

use std::fs;
use std::path::Path;

use camino::Utf8Path;
use quarry_core::utils::safe_join;
use quarry_core::QuarryError;

use crate::cas::{CasStore, ContentHash};
use crate::StoreResult;

/// Links CAS blobs to destination paths, copying when hardlinks fail
#[derive(Debug)]
pub struct Linker<'a> {
    cas_store: &'a CasStore,
}

impl<'a> Linker<'a> {
    pub fn new(cas_store: &'a CasStore) -> Self {
        Self { cas_store }
    }

    /// Place the blob `hash` at `dest`, replacing any existing file
    pub fn link(&self, hash: &ContentHash, dest: &Utf8Path, result: &mut LinkResult) -> StoreResult<()> {
        let source = self.cas_store.path_of(hash);
        if !source.exists() {
            return Err(QuarryError::NotFound {
                url: source.to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QuarryError::io("Failed to create parent directory".to_string(), e))?;
        }
        if dest.exists() {
            fs::remove_file(dest)
                .map_err(|e| QuarryError::io(format!("Failed to replace {}", dest), e))?;
        }

        match fs::hard_link(&source, dest) {
            Ok(_) => result.hardlinks_created += 1,
            Err(_) => {
                fs::copy(&source, dest)
                    .map_err(|e| QuarryError::io("Failed to copy file".to_string(), e))?;
                result.files_copied += 1;
            },
        }
        Ok(())
    }

    /// Link each `(hash, relative path)` pair under `dest_dir`
    pub fn link_all<'p, I>(&self, items: I, dest_dir: &Utf8Path) -> StoreResult<LinkResult>
    where
        I: IntoIterator<Item = (&'p ContentHash, &'p str)>,
    {
        let mut result = LinkResult::default();
        for (hash, relative) in items {
            let relative = safe_join(dest_dir.as_std_path(), Path::new(relative))?;
            let dest = Utf8Path::from_path(&relative).ok_or_else(|| {
                QuarryError::validation("path", relative.display().to_string(), "not UTF-8")
            })?;
            self.link(hash, dest, &mut result)?;
        }
        Ok(result)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkResult {
    pub hardlinks_created: usize,
    pub files_copied: usize,
}

impl LinkResult {
    pub fn total(&self) -> usize {
        self.hardlinks_created + self.files_copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_link_all() {
        let temp_dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        let cas_store = CasStore::new(root.join("store")).unwrap();
        let linker = Linker::new(&cas_store);

        let gem = cas_store.store(b"gem bytes").unwrap();
        let spec = cas_store.store(b"spec bytes").unwrap();
        let dest = root.join("public");

        let result = linker
            .link_all(
                [
                    (&gem, "gems/a-1.0.gem"),
                    (&spec, "quick/Marshal.4.8/a-1.0.gemspec.rz"),
                ],
                &dest,
            )
            .unwrap();

        assert_eq!(result.total(), 2);
        assert_eq!(fs::read(dest.join("gems/a-1.0.gem")).unwrap(), b"gem bytes");
        assert_eq!(
            fs::read(dest.join("quick/Marshal.4.8/a-1.0.gemspec.rz")).unwrap(),
            b"spec bytes"
        );

        // Relinking over existing files is fine
        assert_eq!(linker.link_all([(&gem, "gems/a-1.0.gem")], &dest).unwrap().total(), 1);
    }

    #[test]
    fn test_link_rejects_escaping_paths() {
        let temp_dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        let cas_store = CasStore::new(root.join("store")).unwrap();
        let gem = cas_store.store(b"gem bytes").unwrap();

        let linker = Linker::new(&cas_store);
        assert!(linker.link_all([(&gem, "../escape.gem")], &root.join("public")).is_err());
    }

    #[test]
    fn test_link_missing_blob() {
        let temp_dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        let cas_store = CasStore::new(root.join("store")).unwrap();
        let missing = crate::cas::compute_hash(b"absent");

        let mut result = LinkResult::default();
        let err = Linker::new(&cas_store)
            .link(&missing, &root.join("x.gem"), &mut result)
            .unwrap_err();
        assert!(matches!(err, QuarryError::NotFound { .. }));
    }
}
