//! Gem index publication
//!
//! A publish regenerates every index artifact from the latest repository
//! version: the Marshal `specs` family, the compact index (`names`,
//! `versions`, `info/<name>`), directory listings, and links to the stored
//! archives and gemspecs. Output is staged beside the target directory and
//! swapped in only once everything has been written.

pub mod latest;
pub mod listing;
pub mod publication;
pub mod publisher;

pub use latest::{latest_per_platform, partition, sort_records, Partition};
pub use listing::Listing;
pub use publication::Publication;
pub use publisher::{publish, PublishReport, Publisher};

use quarry_core::QuarryError;

/// Result type for publish operations
pub type PublishResult<T> = Result<T, QuarryError>;
