//! Artifact storage for Quarry repositories
//!
//! Archives and gemspecs live in a content-addressable store keyed by
//! SHA-256. The set of packages in the latest repository version is the
//! [`Inventory`], committed atomically so a failed sync or import leaves
//! the previous version untouched.

pub mod cas;
pub mod inventory;
pub mod link;

// Re-export main types
pub use cas::{CasEntry, CasIndex, CasStore, ContentHash, GcResult};
pub use inventory::{ContentUnit, Inventory, Repository, StoredArtifact};
pub use link::{LinkResult, Linker};

use quarry_core::QuarryError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, QuarryError>;
