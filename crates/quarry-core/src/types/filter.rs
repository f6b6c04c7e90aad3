//! Name-keyed package filters.
//!
//! A filter maps a gem name to either "all versions" or a requirement that
//! narrows the versions it applies to. The synchronizer uses one as an
//! inclusion list and another as an exclusion list.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::package::is_valid_name;
use super::requirement::Requirement;
use crate::error::{QuarryError, QuarryResult};

/// Configuration sentinel meaning "every version of this name"
pub const ALL_VERSIONS: &str = "*";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageFilter {
    entries: IndexMap<String, Option<Requirement>>,
}

impl PackageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from `name = "requirement"` pairs, `"*"` selecting all
    /// versions.
    pub fn from_pairs<I, K, V>(pairs: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut filter = Self::new();
        for (name, value) in pairs {
            let name = name.into();
            if !is_valid_name(&name) {
                return Err(QuarryError::validation(
                    "filter",
                    name,
                    "filter keys must be valid gem names",
                ));
            }
            let value = value.as_ref().trim();
            let requirement = if value == ALL_VERSIONS {
                None
            } else {
                Some(Requirement::parse(value)?)
            };
            filter.insert(name, requirement);
        }
        Ok(filter)
    }

    pub fn insert(&mut self, name: impl Into<String>, requirement: Option<Requirement>) {
        self.entries.insert(name.into(), requirement);
    }

    /// `None` if the name is absent, `Some(None)` if all versions are
    /// selected, `Some(Some(req))` if a requirement narrows the selection.
    pub fn lookup(&self, name: &str) -> Option<Option<&Requirement>> {
        self.entries.get(name).map(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Requirement>)> {
        self.entries
            .iter()
            .map(|(name, requirement)| (name.as_str(), requirement.as_ref()))
    }
}
