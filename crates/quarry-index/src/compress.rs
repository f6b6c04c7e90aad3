//! gzip and zlib wrappers for index artifacts.
//!
//! `*.gz` index files are gzip; `.gemspec.rz` files are bare zlib streams.

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use quarry_core::{QuarryError, QuarryResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

pub fn gzip(bytes: &[u8]) -> QuarryResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .map_err(|e| QuarryError::io("gzip compression failed".to_string(), e))
}

pub fn gunzip(bytes: &[u8]) -> QuarryResult<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| QuarryError::codec(format!("invalid gzip stream: {}", e)))?;
    Ok(out)
}

/// zlib-deflate, as used for `.gemspec.rz`
pub fn deflate(bytes: &[u8]) -> QuarryResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|_| encoder.finish())
        .map_err(|e| QuarryError::io("zlib compression failed".to_string(), e))
}

pub fn inflate(bytes: &[u8]) -> QuarryResult<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| QuarryError::codec(format!("invalid zlib stream: {}", e)))?;
    Ok(out)
}
