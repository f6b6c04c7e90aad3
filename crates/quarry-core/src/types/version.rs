//! Gem version ordering.
//!
//! Versions are kept as the original strings; ordering is computed from a
//! token decomposition rather than from a parsed numeric form. A version is
//! split into alternating numeric and non-numeric runs, `.` always closing
//! the current run. Positions are compared pairwise with the shorter side
//! padded by `"0"`; numeric runs compare by value and rank above non-numeric
//! runs, which compare lexically.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::QuarryError;

static STABLE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)*$").expect("stable version pattern"));

static VERSION_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.-]+$").expect("version charset pattern"));

/// A gem version string with RubyGems ordering semantics.
///
/// Equality is ordering-equality: `"0.0.0"` and `"0"` compare equal even
/// though their text differs. Use [`Version::as_str`] when the exact text
/// matters (paths, index lines).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Wrap a version string without validation
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The original version text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token decomposition used for comparison
    pub fn tokens(&self) -> Vec<&str> {
        tokenize(&self.0)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        is_prerelease(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for Version {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_valid_version(s) {
            return Err(QuarryError::validation(
                "version",
                s,
                "must consist of word characters, dots and hyphens",
            ));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        compare(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

/// Split a version string into its comparison runs.
///
/// Digits accumulate into a numeric run, any other character except `.`
/// into a non-numeric run, and a change of kind closes a non-empty run.
/// A `.` always closes the current run, even an empty one. The trailing run
/// is always emitted.
pub fn tokenize(version: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut numeric = true;
    let mut start = 0;

    for (idx, ch) in version.char_indices() {
        if ch.is_ascii_digit() {
            if !numeric {
                if idx > start {
                    tokens.push(&version[start..idx]);
                    start = idx;
                }
                numeric = true;
            }
        } else if ch == '.' {
            tokens.push(&version[start..idx]);
            start = idx + 1;
            numeric = true;
        } else if numeric {
            if idx > start {
                tokens.push(&version[start..idx]);
                start = idx;
            }
            numeric = false;
        }
    }

    tokens.push(&version[start..]);
    tokens
}

/// Comparison key of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Digits with leading zeros stripped, compared by magnitude
    Numeric(&'a str),
    /// Anything else, including the empty run
    Alpha(&'a str),
}

impl<'a> Token<'a> {
    fn classify(raw: &'a str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Token::Numeric(raw.trim_start_matches('0'))
        } else {
            Token::Alpha(raw)
        }
    }
}

impl Ord for Token<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Arbitrary precision: fewer significant digits is smaller
            (Token::Numeric(a), Token::Numeric(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Token::Numeric(_), Token::Alpha(_)) => Ordering::Greater,
            (Token::Alpha(_), Token::Numeric(_)) => Ordering::Less,
            (Token::Alpha(a), Token::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Token<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version strings.
///
/// Missing trailing runs on the shorter side count as `"0"`, so `"1.0.0"`
/// equals `"1"` while `"1.0.a"` sorts below it.
pub fn compare(a: &str, b: &str) -> Ordering {
    let left = tokenize(a);
    let right = tokenize(b);
    let len = left.len().max(right.len());

    for idx in 0..len {
        let l = Token::classify(left.get(idx).copied().unwrap_or("0"));
        let r = Token::classify(right.get(idx).copied().unwrap_or("0"));
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// True iff the version is not a plain dotted-numeric release
pub fn is_prerelease(version: &str) -> bool {
    !STABLE_VERSION.is_match(version)
}

/// True iff the version only uses word characters, dots and hyphens
pub fn is_valid_version(version: &str) -> bool {
    VERSION_CHARS.is_match(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("1.2.3"), vec!["1", "2", "3"]);
        assert_eq!(tokenize("1.0a2"), vec!["1", "0", "a", "2"]);
        assert_eq!(tokenize("1a"), vec!["1", "a"]);
        assert_eq!(tokenize("1.a"), vec!["1", "a"]);
        assert_eq!(tokenize("1..2"), vec!["1", "", "2"]);
        assert_eq!(tokenize("1."), vec!["1", ""]);
        assert_eq!(tokenize(""), vec![""]);
        assert_eq!(tokenize("rc"), vec!["rc"]);
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(compare("0.0.0", "0"), Ordering::Equal);
        assert_eq!(compare("1.0.0", "0"), Ordering::Greater);
        assert_eq!(compare("1.0.0", "1"), Ordering::Equal);
        assert_eq!(compare("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare("1.0.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_numeric_beats_alpha() {
        assert_eq!(compare("1a", "1.a"), Ordering::Equal);
        assert_eq!(compare("1.0", "1.a"), Ordering::Greater);
        assert_eq!(compare("1.0", "1.0a"), Ordering::Greater);
        assert_eq!(compare("1.0a2", "1.0.a.1"), Ordering::Greater);
        assert_eq!(compare("1.0b1", "1.0.a.2"), Ordering::Greater);
        assert_eq!(compare("3.0.0a5", "3"), Ordering::Less);
    }

    #[test]
    fn test_numeric_magnitude() {
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("1.010", "1.10"), Ordering::Equal);
        assert_eq!(
            compare("1.123456789012345678901234567890", "1.99999999999999999999"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_version_ord() {
        let mut versions: Vec<Version> = ["2.0", "1.0.a", "1.10", "1.0", "1.9.rc1"]
            .iter()
            .map(|v| Version::new(*v))
            .collect();
        versions.sort();
        let sorted: Vec<&str> = versions.iter().map(Version::as_str).collect();
        assert_eq!(sorted, vec!["1.0.a", "1.0", "1.9.rc1", "1.10", "2.0"]);
        assert_eq!(Version::new("0.0.0"), Version::new("0"));
    }

    #[test]
    fn test_is_prerelease() {
        assert!(!is_prerelease("1.0.0"));
        assert!(!is_prerelease("10"));
        assert!(is_prerelease("1.1.a"));
        assert!(is_prerelease("1.0.0.rc1"));
        assert!(is_prerelease("1."));
        assert!(is_prerelease(""));
    }

    #[test]
    fn test_version_from_str() {
        assert!(Version::from_str("1.0.0.pre").is_ok());
        assert!(Version::from_str("1.0 beta").is_err());
        assert!(Version::from_str("").is_err());
    }
}
