//! Core data types for gem index management.
//!
//! This module provides the fundamental types used throughout Quarry:
//! - Version ordering following the RubyGems comparison rules
//! - Requirement expressions (`>= 1&< 3`)
//! - Package identity and normalized package records
//! - Name-keyed inclusion/exclusion filters
//! - Download and error policies for synchronization

pub mod filter;
pub mod package;
pub mod policy;
pub mod requirement;
pub mod version;

// Re-export all public types
pub use filter::{PackageFilter, ALL_VERSIONS};
pub use package::{
    ext_version, is_valid_name, split_ext_version, PackageKey, PackageRecord, DEFAULT_PLATFORM,
};
pub use policy::{DownloadPolicy, InfoErrorPolicy};
pub use requirement::{satisfies, Clause, Op, Requirement};
pub use version::{compare, is_prerelease, is_valid_version, tokenize, Version};
