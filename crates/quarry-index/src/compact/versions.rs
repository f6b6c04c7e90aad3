//! The `versions` file: one `name ext_version,ext_version md5` line per gem.
//!
//! A gem may appear on several lines (appended releases); their version
//! lists are concatenated in file order. Entries prefixed with `-` are
//! yanks and remove an earlier occurrence of the same external version.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use quarry_core::{QuarryError, QuarryResult};
use serde::{Deserialize, Serialize};

use super::preamble::{body_lines, SEPARATOR};

/// Aggregated versions line for one gem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionsEntry {
    pub name: String,
    pub ext_versions: Vec<String>,
    /// MD5 of the gem's `info` file
    pub md5: Option<String>,
}

impl VersionsEntry {
    pub fn new(name: impl Into<String>, ext_versions: Vec<String>, md5: Option<String>) -> Self {
        Self {
            name: name.into(),
            ext_versions,
            md5,
        }
    }
}

/// Decode a `versions` document, one entry per distinct name in first-seen
/// order. Names are not validated here.
pub fn decode(text: &str) -> QuarryResult<Vec<VersionsEntry>> {
    let mut entries: IndexMap<String, VersionsEntry> = IndexMap::new();

    for line in body_lines(text) {
        let mut fields = line.split_whitespace();
        let (name, versions) = match (fields.next(), fields.next()) {
            (Some(name), Some(versions)) => (name, versions),
            _ => {
                return Err(QuarryError::codec(format!(
                    "versions line has no version list: '{}'",
                    line
                )))
            },
        };
        let md5 = fields.next();
        if fields.next().is_some() {
            return Err(QuarryError::codec(format!(
                "versions line has trailing fields: '{}'",
                line
            )));
        }

        let entry = entries
            .entry(name.to_string())
            .or_insert_with(|| VersionsEntry::new(name, Vec::new(), None));

        for version in versions.split(',').filter(|v| !v.is_empty()) {
            match version.strip_prefix('-') {
                Some(yanked) => entry.ext_versions.retain(|existing| existing != yanked),
                None => entry.ext_versions.push(version.to_string()),
            }
        }

        // The first checksum seen for a name is kept
        if entry.md5.is_none() {
            entry.md5 = md5.map(str::to_string);
        }
    }

    Ok(entries.into_values().collect())
}

/// Format the optional header timestamp
pub fn format_created_at(created_at: &DateTime<Utc>) -> String {
    created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Encode a `versions` document, with a `created_at` header when given
pub fn encode(entries: &[VersionsEntry], created_at: Option<&DateTime<Utc>>) -> String {
    let mut out = String::new();
    if let Some(created_at) = created_at {
        let _ = writeln!(out, "created_at: {}", format_created_at(created_at));
    }
    out.push_str(SEPARATOR);
    out.push('\n');

    for entry in entries {
        out.push_str(&entry.name);
        out.push(' ');
        out.push_str(&entry.ext_versions.join(","));
        if let Some(md5) = &entry.md5 {
            out.push(' ');
            out.push_str(md5);
        }
        out.push('\n');
    }
    out
}
