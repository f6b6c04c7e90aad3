//! SHA-256 content hashes
//!
//! The same digest the compact index publishes as a gem's `checksum`, so a
//! checksum from an `info` line addresses the archive directly.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use quarry_core::QuarryError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a hex digest; upper and lower case are both accepted
    pub fn from_hex(hex_str: &str) -> StoreResult<Self> {
        let invalid = |reason: &str| QuarryError::validation("sha256", hex_str, reason);
        let bytes = hex::decode(hex_str).map_err(|e| invalid(&e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| invalid("expected 64 hex characters"))?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = QuarryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

/// SHA-256 of content
pub fn compute_hash(content: &[u8]) -> ContentHash {
    ContentHash::new(Sha256::digest(content).into())
}

/// SHA-256 of a file's contents
pub fn hash_file<P: AsRef<Path>>(path: P) -> StoreResult<ContentHash> {
    let content = std::fs::read(path.as_ref())
        .map_err(|e| QuarryError::io("Failed to read file for hashing".to_string(), e))?;
    Ok(compute_hash(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::utils::sha256_hex;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            compute_hash(b"hello world").to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_matches_checksum_helper() {
        let content = b"gem archive bytes";
        assert_eq!(compute_hash(content).to_hex(), sha256_hex(content));
    }

    #[test]
    fn test_invalid_hex() {
        assert!(ContentHash::from_hex("abc").is_err());
        assert!(ContentHash::from_hex(&"zz".repeat(32)).is_err());
        assert!(ContentHash::from_hex(&"ab".repeat(16)).is_err());
    }

    #[test]
    fn test_uppercase_hex() {
        let hash = compute_hash(b"x");
        assert_eq!(ContentHash::from_hex(&hash.to_hex().to_uppercase()).unwrap(), hash);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash = compute_hash(b"x");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.gem");
        std::fs::write(&path, b"test content").unwrap();
        assert_eq!(hash_file(&path).unwrap(), compute_hash(b"test content"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn hex_round_trip(content in prop::collection::vec(any::<u8>(), 0..512)) {
            let hash = compute_hash(&content);
            prop_assert_eq!(hash, compute_hash(&content));
            prop_assert_eq!(ContentHash::from_hex(&hash.to_hex()).unwrap(), hash);
        }
    }
}
