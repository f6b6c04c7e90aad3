//! Compact index codec (`names`, `versions`, `info/<name>`).
//!
//! All three files share one layout: an optional header, a bare `---`
//! separator, then one record per line.

pub mod info;
pub mod names;
pub mod preamble;
pub mod versions;

pub use info::{decode as decode_info, encode as encode_info, encode_line as encode_info_line};
pub use names::{decode as decode_names, encode as encode_names};
pub use preamble::{body_lines, BodyLines, ParseState, SEPARATOR};
pub use versions::{decode as decode_versions, encode as encode_versions, VersionsEntry};

/// Suffix of the byte-identical copy served for directory listings
pub const LIST_SUFFIX: &str = ".list";
