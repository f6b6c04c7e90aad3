//! Utility functions and helpers.
//!
//! Common functionality used across multiple Quarry crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{md5_hex, sha256_hex, ExpectedDigest};
pub use path::{is_safe_path, normalize_path, safe_join};
