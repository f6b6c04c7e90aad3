//! Transport for remote gem repositories
//!
//! This crate provides the [`Fetcher`] abstraction the synchronizer pulls
//! index files and archives through, and an HTTP implementation with
//! connection pooling, retry logic and digest verification.

pub mod client;
pub mod fetcher;

// Re-export main types
pub use client::{AuthConfig, RegistryClient, RetryConfig};
pub use fetcher::{join_url, Fetcher};

use quarry_core::QuarryError;

/// Result type for transport operations
pub type RegistryResult<T> = Result<T, QuarryError>;
