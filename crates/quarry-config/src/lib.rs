//! Configuration parsing for Quarry
//!
//! This crate handles parsing and validation of `quarry.toml`, plus the
//! environment and command-line overrides layered on top of it.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};
pub use self::toml::{
    parse_quarry_toml, serialize_quarry_toml, PublishSection, QuarryToml, RemoteSection,
    RepositorySection, CONFIG_FILE,
};

use quarry_core::QuarryError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, QuarryError>;
