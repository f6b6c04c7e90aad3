//! Index codecs for gem repositories.
//!
//! Covers the binary Marshal 4.8 indexes (`specs`, `latest_specs`,
//! `prerelease_specs`, `quick/Marshal.4.8/*.gemspec.rz`), the compact
//! index (`names`, `versions`, `info/<name>`) and metadata extraction from
//! `.gem` archives.

pub mod compact;
pub mod compress;
pub mod gem;
pub mod marshal;
pub mod specs;

pub use compact::VersionsEntry;
pub use gem::{extract, ExtractedGem, GemBuilder};
pub use marshal::{ClassRegistry, Value};
