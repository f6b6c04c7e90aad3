//! Digest helpers for artifact integrity.
//!
//! Archives are identified by SHA-256; compact index `info` files carry an
//! MD5 in the `versions` stream.

use md5::Md5;
use sha2::{Digest, Sha256};

use crate::error::{QuarryError, QuarryResult};

/// Compute the SHA-256 of data as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compute the MD5 of data as lowercase hex
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Digest a downloaded resource is expected to have
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpectedDigest {
    Md5(String),
    Sha256(String),
}

impl ExpectedDigest {
    pub fn algorithm(&self) -> &'static str {
        match self {
            ExpectedDigest::Md5(_) => "md5",
            ExpectedDigest::Sha256(_) => "sha256",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ExpectedDigest::Md5(value) | ExpectedDigest::Sha256(value) => value,
        }
    }

    /// Verify data against this digest; `artifact` names it in the error
    pub fn verify(&self, artifact: &str, data: &[u8]) -> QuarryResult<()> {
        let actual = match self {
            ExpectedDigest::Md5(_) => md5_hex(data),
            ExpectedDigest::Sha256(_) => sha256_hex(data),
        };
        if actual.eq_ignore_ascii_case(self.value()) {
            Ok(())
        } else {
            Err(QuarryError::IntegrityFailure {
                artifact: artifact.to_string(),
                expected: format!("{}:{}", self.algorithm(), self.value()),
                actual: format!("{}:{}", self.algorithm(), actual),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(md5_hex(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_verify_success() {
        let data = b"test data";
        assert!(ExpectedDigest::Sha256(sha256_hex(data))
            .verify("test", data)
            .is_ok());
        assert!(ExpectedDigest::Md5(md5_hex(data).to_uppercase())
            .verify("test", data)
            .is_ok());
    }

    #[test]
    fn test_verify_failure() {
        let wrong = "0".repeat(32);
        let err = ExpectedDigest::Md5(wrong)
            .verify("info/rake", b"data")
            .unwrap_err();
        match err {
            QuarryError::IntegrityFailure { artifact, .. } => assert_eq!(artifact, "info/rake"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
