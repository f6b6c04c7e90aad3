//! The per-gem `info/<name>` file.
//!
//! Each line is `ext_version dep:req,dep:req|checksum:<sha256>[,ruby:req]
//! [,rubygems:req]`. Unlike the `versions` stream, a bad version or an
//! unknown attribute is fatal for the whole file.

use std::collections::HashSet;

use indexmap::IndexMap;
use quarry_core::{split_ext_version, PackageRecord, QuarryError, QuarryResult};

use super::preamble::{body_lines, SEPARATOR};

/// Decode an `info` document for `name`.
///
/// With a filter, only lines whose external version is in the set are
/// decoded; the rest are skipped without validation.
pub fn decode(
    name: &str,
    text: &str,
    filter: Option<&HashSet<String>>,
) -> QuarryResult<Vec<PackageRecord>> {
    let mut records = Vec::new();

    for line in body_lines(text) {
        let (front, attributes) = line
            .split_once('|')
            .ok_or_else(|| QuarryError::codec(format!("info line without '|': '{}'", line)))?;
        let (ext, dependencies) = match front.split_once(' ') {
            Some((ext, dependencies)) => (ext, dependencies.trim()),
            None => (front.trim(), ""),
        };

        if let Some(filter) = filter {
            if !filter.contains(ext) {
                continue;
            }
        }

        records.push(decode_line(name, ext, dependencies, attributes)?);
    }

    Ok(records)
}

fn decode_line(
    name: &str,
    ext: &str,
    dependencies: &str,
    attributes: &str,
) -> QuarryResult<PackageRecord> {
    let mut deps = IndexMap::new();
    for item in dependencies.split(',').filter(|item| !item.is_empty()) {
        let (dep, requirement) = item.split_once(':').ok_or_else(|| {
            QuarryError::codec(format!("dependency without requirement: '{}'", item))
        })?;
        deps.insert(dep.to_string(), requirement.to_string());
    }

    let mut checksum = None;
    let mut ruby = None;
    let mut rubygems = None;
    for statement in attributes.trim().split(',').filter(|s| !s.is_empty()) {
        let (key, value) = statement.split_once(':').ok_or_else(|| {
            QuarryError::codec(format!("attribute without value: '{}'", statement))
        })?;
        match key {
            "checksum" => checksum = Some(value.to_string()),
            "ruby" => ruby = Some(value.to_string()),
            "rubygems" => rubygems = Some(value.to_string()),
            _ => {
                return Err(QuarryError::validation(
                    "info attribute",
                    statement,
                    "expected one of checksum, ruby, rubygems",
                ))
            },
        }
    }
    let checksum = checksum.ok_or_else(|| {
        QuarryError::validation("info line", ext, "missing required checksum attribute")
    })?;

    let (version, platform) = split_ext_version(ext);
    Ok(PackageRecord::new(name, version, platform, checksum)?
        .with_dependencies(deps)
        .with_required_ruby_version(ruby)
        .with_required_rubygems_version(rubygems))
}

/// Encode one record as an `info` line (without newline)
pub fn encode_line(record: &PackageRecord) -> String {
    let dependencies: Vec<String> = record
        .dependencies
        .iter()
        .map(|(dep, requirement)| format!("{}:{}", dep, requirement))
        .collect();

    let mut line = format!(
        "{} {}|checksum:{}",
        record.ext_version(),
        dependencies.join(","),
        record.checksum
    );
    if let Some(ruby) = &record.required_ruby_version {
        line.push_str(",ruby:");
        line.push_str(ruby);
    }
    if let Some(rubygems) = &record.required_rubygems_version {
        line.push_str(",rubygems:");
        line.push_str(rubygems);
    }
    line
}

/// Encode an `info` document; no header, just the separator
pub fn encode<'a>(records: impl IntoIterator<Item = &'a PackageRecord>) -> String {
    let mut out = String::from(SEPARATOR);
    out.push('\n');
    for record in records {
        out.push_str(&encode_line(record));
        out.push('\n');
    }
    out
}
