//! # quarry-core
//!
//! Core types and utilities shared across all Quarry crates.
//!
//! This crate provides:
//! - The gem version ordering and requirement engine
//! - PackageKey and PackageRecord, the normalized unit of package metadata
//! - Inclusion/exclusion filters used by the synchronizer
//! - QuarryError enum for unified error handling
//! - Digest and path helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Requirement, PackageRecord, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{QuarryError, QuarryResult};
pub use types::{
    ext_version, split_ext_version, Clause, DownloadPolicy, InfoErrorPolicy, Op, PackageFilter,
    PackageKey, PackageRecord, Requirement, Version, DEFAULT_PLATFORM,
};
