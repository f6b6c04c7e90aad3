//! Materialising stored content into publication directories
//!
//! Blobs are hardlinked out of the CAS, falling back to copying when the
//! destination is on another filesystem.

pub mod linker;

// Re-export main types
pub use linker::{LinkResult, Linker};
