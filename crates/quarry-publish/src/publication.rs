//! All-or-nothing publication directories.
//!
//! Files are written into a hidden staging directory next to the target.
//! `commit` swaps the staging directory into place; a publication dropped
//! before commit removes its staging directory and leaves the target as it
//! was.

use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use quarry_core::utils::safe_join;
use quarry_core::QuarryError;
use tracing::{debug, warn};

use crate::PublishResult;

pub const LIST_SUFFIX: &str = ".list";

#[derive(Debug)]
pub struct Publication {
    target: Utf8PathBuf,
    staging: Utf8PathBuf,
    files_written: usize,
    committed: bool,
}

impl Publication {
    /// Start a publication that will replace `target` on commit
    pub fn begin<P: AsRef<Utf8Path>>(target: P) -> PublishResult<Self> {
        let target = target.as_ref().to_path_buf();
        let staging = sibling(&target, "staging")?;

        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| {
                QuarryError::io(format!("Failed to clear stale staging directory {}", staging), e)
            })?;
        }
        fs::create_dir_all(&staging).map_err(|e| {
            QuarryError::io(format!("Failed to create staging directory {}", staging), e)
        })?;
        debug!(output = %target, %staging, "started publication");

        Ok(Self {
            target,
            staging,
            files_written: 0,
            committed: false,
        })
    }

    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    pub fn staging_path(&self) -> &Utf8Path {
        &self.staging
    }

    pub fn files_written(&self) -> usize {
        self.files_written
    }

    /// Staging location of `relative`, rejecting paths that escape it
    pub fn path_for(&self, relative: &str) -> PublishResult<Utf8PathBuf> {
        let joined = safe_join(self.staging.as_std_path(), Path::new(relative))?;
        Utf8PathBuf::from_path_buf(joined).map_err(|path| {
            QuarryError::validation("path", path.display().to_string(), "path is not UTF-8")
        })
    }

    pub fn write(&mut self, relative: &str, bytes: &[u8]) -> PublishResult<()> {
        let path = self.path_for(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QuarryError::io(format!("Failed to create {}", parent), e))?;
        }
        fs::write(&path, bytes)
            .map_err(|e| QuarryError::io(format!("Failed to write {}", relative), e))?;
        self.files_written += 1;
        Ok(())
    }

    /// Write `relative` and its byte-identical `.list` companion
    pub fn write_with_list(&mut self, relative: &str, bytes: &[u8]) -> PublishResult<()> {
        self.write(relative, bytes)?;
        self.write(&format!("{}{}", relative, LIST_SUFFIX), bytes)
    }

    /// Swap the staged tree into place and return the target path
    pub fn commit(mut self) -> PublishResult<Utf8PathBuf> {
        let previous = sibling(&self.target, "previous")?;
        if previous.exists() {
            fs::remove_dir_all(&previous).map_err(|e| {
                QuarryError::io(format!("Failed to clear {}", previous), e)
            })?;
        }

        let had_previous = self.target.exists();
        if had_previous {
            fs::rename(&self.target, &previous).map_err(|e| {
                QuarryError::io(format!("Failed to move aside {}", self.target), e)
            })?;
        }

        if let Err(e) = fs::rename(&self.staging, &self.target) {
            if had_previous {
                if let Err(restore) = fs::rename(&previous, &self.target) {
                    warn!(output = %self.target, error = %restore, "failed to restore previous publication");
                }
            }
            return Err(QuarryError::io(
                format!("Failed to move publication into {}", self.target),
                e,
            ));
        }
        self.committed = true;

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&previous) {
                warn!(path = %previous, error = %e, "failed to remove previous publication");
            }
        }
        debug!(output = %self.target, files = self.files_written, "committed publication");
        Ok(self.target.clone())
    }
}

impl Drop for Publication {
    fn drop(&mut self) {
        if self.committed || !self.staging.exists() {
            return;
        }
        match fs::remove_dir_all(&self.staging) {
            Ok(()) => debug!(staging = %self.staging, "discarded uncommitted publication"),
            Err(e) => warn!(staging = %self.staging, error = %e, "failed to discard staging directory"),
        }
    }
}

/// `<parent>/.<name>.<role>-<pid>`
fn sibling(target: &Utf8Path, role: &str) -> PublishResult<Utf8PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        QuarryError::configuration("publish.output", format!("'{}' has no directory name", target))
    })?;
    let parent = target.parent().unwrap_or_else(|| Utf8Path::new(""));
    Ok(parent.join(format!(".{}.{}-{}", name, role, std::process::id())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn target_in(temp_dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp_dir.path().join("public")).unwrap()
    }

    #[test]
    fn test_commit_moves_files_into_place() {
        let temp_dir = tempdir().unwrap();
        let target = target_in(&temp_dir);

        let mut publication = Publication::begin(&target).unwrap();
        publication.write("info/rake", b"---\n").unwrap();
        publication.write_with_list("names", b"---\nrake\n").unwrap();
        assert_eq!(publication.files_written(), 3);
        assert!(!target.exists());

        let staging = publication.staging_path().to_path_buf();
        publication.commit().unwrap();
        assert!(!staging.exists());
        assert_eq!(fs::read(target.join("info/rake")).unwrap(), b"---\n");
        assert_eq!(
            fs::read(target.join("names")).unwrap(),
            fs::read(target.join("names.list")).unwrap()
        );
    }

    #[test]
    fn test_commit_replaces_previous_publication() {
        let temp_dir = tempdir().unwrap();
        let target = target_in(&temp_dir);

        let mut first = Publication::begin(&target).unwrap();
        first.write("stale", b"old").unwrap();
        first.commit().unwrap();

        let mut second = Publication::begin(&target).unwrap();
        second.write("fresh", b"new").unwrap();
        second.commit().unwrap();

        assert!(!target.join("stale").exists());
        assert!(target.join("fresh").exists());
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_drop_discards_staging() {
        let temp_dir = tempdir().unwrap();
        let target = target_in(&temp_dir);

        let staging = {
            let mut publication = Publication::begin(&target).unwrap();
            publication.write("specs.4.8", b"\x04\x08[\x00").unwrap();
            publication.staging_path().to_path_buf()
        };
        assert!(!staging.exists());
        assert!(!target.exists());
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let temp_dir = tempdir().unwrap();
        let mut publication = Publication::begin(target_in(&temp_dir)).unwrap();
        assert!(publication.write("../outside", b"x").is_err());
    }
}
