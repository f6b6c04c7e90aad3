//! `.gem` archives: metadata extraction and assembly

pub mod builder;
pub mod extract;
pub mod yaml;

pub use builder::GemBuilder;
pub use extract::{extract, read_metadata, record_from_spec, ExtractedGem};
