//! Package identity and normalized package records.
//!
//! A [`PackageRecord`] is produced either from an uploaded `.gem` archive or
//! from a remote compact index entry. Both paths end in the same shape.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::version::{is_prerelease, is_valid_version};
use crate::error::{QuarryError, QuarryResult};

/// Platform marker for pure-Ruby gems
pub const DEFAULT_PLATFORM: &str = "ruby";

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.-]+$").expect("gem name pattern"));

/// Check if this is a valid gem name
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Split `version[-platform]` into version and platform.
///
/// Only the first hyphen separates; `1.0-x86_64-linux` has platform
/// `x86_64-linux`.
pub fn split_ext_version(ext_version: &str) -> (&str, &str) {
    match ext_version.split_once('-') {
        Some((version, platform)) if !platform.is_empty() => (version, platform),
        Some((version, _)) => (version, DEFAULT_PLATFORM),
        None => (ext_version, DEFAULT_PLATFORM),
    }
}

/// Join version and platform into the external version string
pub fn ext_version(version: &str, platform: &str) -> String {
    if platform == DEFAULT_PLATFORM || platform.is_empty() {
        version.to_string()
    } else {
        format!("{}-{}", version, platform)
    }
}

/// Identity of a package unit within a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageKey {
    pub name: String,
    pub version: String,
    pub platform: String,
}

impl PackageKey {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            platform: platform.into(),
        }
    }

    /// Build a key from a name and an external version string
    pub fn from_ext_version(name: impl Into<String>, ext: &str) -> Self {
        let (version, platform) = split_ext_version(ext);
        Self::new(name, version, platform)
    }

    pub fn ext_version(&self) -> String {
        ext_version(&self.version, &self.platform)
    }

    /// `<name>-<ext_version>`, the stem shared by archive and gemspec files
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.ext_version())
    }

    /// Relative path of the archive artifact
    pub fn gem_path(&self) -> String {
        format!("gems/{}.gem", self.full_name())
    }

    /// Relative path of the compressed gemspec artifact
    pub fn gemspec_path(&self) -> String {
        format!("quick/Marshal.4.8/{}.gemspec.rz", self.full_name())
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Attributes of one package unit.
///
/// Records are immutable once built; a changed package is a new record
/// with a new checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub platform: String,
    /// SHA-256 of the `.gem` archive, lowercase hex
    pub checksum: String,
    pub prerelease: bool,
    /// Dependency name to requirement expression, in declaration order
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_ruby_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_rubygems_version: Option<String>,
}

impl PackageRecord {
    /// Create a record with validated name and version.
    ///
    /// `prerelease` is derived from the version text.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        platform: impl Into<String>,
        checksum: impl Into<String>,
    ) -> QuarryResult<Self> {
        let name = name.into();
        let version = version.into();
        let platform = platform.into();

        if !is_valid_name(&name) {
            return Err(QuarryError::validation(
                "name",
                name,
                "gem names may only contain word characters, dots and hyphens",
            ));
        }
        if !is_valid_version(&version) {
            return Err(QuarryError::validation(
                "version",
                version,
                "versions may only contain word characters, dots and hyphens",
            ));
        }
        if platform.is_empty() {
            return Err(QuarryError::validation(
                "platform",
                platform,
                "platform must not be empty",
            ));
        }

        Ok(Self {
            prerelease: is_prerelease(&version),
            name,
            version,
            platform,
            checksum: checksum.into(),
            dependencies: IndexMap::new(),
            required_ruby_version: None,
            required_rubygems_version: None,
        })
    }

    pub fn with_dependencies(mut self, dependencies: IndexMap<String, String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_required_ruby_version(mut self, requirement: Option<String>) -> Self {
        self.required_ruby_version = requirement;
        self
    }

    pub fn with_required_rubygems_version(mut self, requirement: Option<String>) -> Self {
        self.required_rubygems_version = requirement;
        self
    }

    pub fn key(&self) -> PackageKey {
        PackageKey::new(&self.name, &self.version, &self.platform)
    }

    pub fn ext_version(&self) -> String {
        ext_version(&self.version, &self.platform)
    }

    pub fn gem_path(&self) -> String {
        self.key().gem_path()
    }

    pub fn gemspec_path(&self) -> String {
        self.key().gemspec_path()
    }
}
