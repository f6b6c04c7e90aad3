//! Quarry benchmarking suite
//!
//! Benchmarks for version ordering, the index codecs and publishing.

pub mod common;

pub use common::*;
