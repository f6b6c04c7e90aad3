//! Content-addressable storage
//!
//! Content is sharded as `ab/cd/abcd...` under the store root, with a JSON
//! index recording size and store time per hash.

pub mod hash;
pub mod index;
pub mod store;

// Re-export main types
pub use hash::{compute_hash, ContentHash};
pub use index::{CasEntry, CasIndex};
pub use store::{CasStore, GcResult};
