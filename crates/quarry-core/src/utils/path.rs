//! Path utilities for materializing artifacts.
//!
//! Artifact paths are derived from remote-supplied names, so every join into
//! a publication or store root goes through a traversal check.

use crate::error::{QuarryError, QuarryResult};
use std::path::{Component, Path, PathBuf};

/// Drop `.` components; anything else is kept as written
pub fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Check that a relative artifact path names something strictly below its
/// root. Parent components are never valid in artifact paths.
pub fn is_safe_path(path: &Path) -> bool {
    let mut named = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {},
            // Prefix, RootDir and ParentDir
            _ => return false,
        }
    }
    named
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> QuarryResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(QuarryError::validation(
            "path",
            path.display().to_string(),
            "artifact paths must stay inside their root directory",
        ));
    }

    Ok(base.join(normalize_path(path)))
}
