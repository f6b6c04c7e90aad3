//! Metadata extraction from `.gem` archives
//!
//! A `.gem` is a plain (uncompressed) tar holding `metadata.gz`,
//! `data.tar.gz` and `checksums.yaml.gz`. Only the metadata is read; the
//! payload is never unpacked.

use std::io::Read;

use indexmap::IndexMap;
use quarry_core::utils::sha256_hex;
use quarry_core::{PackageRecord, QuarryError, QuarryResult};
use tar::Archive;
use tracing::debug;

use crate::compress::{deflate, gunzip};
use crate::gem::yaml;
use crate::marshal::{self, ClassRegistry, Value};
use crate::specs::decode_platform;

/// Archive entry holding the gzipped YAML specification
pub const METADATA_ENTRY: &str = "metadata.gz";

const SPECIFICATION_CLASS: &str = "Gem::Specification";

/// What the publisher needs from one archive
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedGem {
    pub record: PackageRecord,
    /// zlib-compressed Marshal `Gem::Specification` for `quick/Marshal.4.8`
    pub gemspec: Vec<u8>,
}

/// Extract the index record and quick gemspec from archive bytes.
///
/// The record checksum is the SHA-256 of the whole archive.
pub fn extract(archive: &[u8], registry: &ClassRegistry) -> QuarryResult<ExtractedGem> {
    let metadata = read_metadata(archive)?;
    let text = std::str::from_utf8(&metadata)
        .map_err(|e| QuarryError::codec(format!("gem metadata is not UTF-8: {}", e)))?;

    let mut spec = yaml::load(text, registry)?;
    if spec.class_name() != Some(SPECIFICATION_CLASS) {
        return Err(QuarryError::codec(format!(
            "gem metadata is not a {}",
            SPECIFICATION_CLASS
        )));
    }

    let record = record_from_spec(&spec, sha256_hex(archive))?;
    debug!(gem = %record.key(), "extracted gem metadata");

    // The date is build noise; leaving it out keeps gemspecs reproducible
    spec.remove_ivar("date");
    let lowered = registry.lower(spec)?;
    let gemspec = deflate(&marshal::dump(&lowered))?;

    Ok(ExtractedGem { record, gemspec })
}

/// Return the decompressed YAML from the `metadata.gz` entry
pub fn read_metadata(archive: &[u8]) -> QuarryResult<Vec<u8>> {
    let mut tar = Archive::new(archive);
    let entries = tar
        .entries()
        .map_err(|e| QuarryError::codec(format!("gem is not a tar archive: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| QuarryError::codec(format!("corrupt gem archive: {}", e)))?;
        let is_metadata = entry
            .path()
            .map(|path| path.as_os_str() == METADATA_ENTRY)
            .unwrap_or(false);
        if !is_metadata {
            continue;
        }

        let mut packed = Vec::new();
        entry
            .read_to_end(&mut packed)
            .map_err(|e| QuarryError::codec(format!("corrupt {}: {}", METADATA_ENTRY, e)))?;
        return gunzip(&packed);
    }

    Err(QuarryError::codec(format!(
        "gem archive has no {} entry",
        METADATA_ENTRY
    )))
}

/// Build an index record from a parsed specification.
///
/// Only runtime dependencies are recorded, matching what the compact index serves.
pub fn record_from_spec(spec: &Value, checksum: String) -> QuarryResult<PackageRecord> {
    let name = spec
        .ivar("name")
        .and_then(Value::as_text)
        .ok_or_else(|| QuarryError::codec("gem specification has no name"))?;
    let version = spec
        .ivar("version")
        .map(version_text)
        .transpose()?
        .ok_or_else(|| QuarryError::codec("gem specification has no version"))?;
    let platform = decode_platform(spec.ivar("platform").unwrap_or(&Value::Nil))?;

    let mut dependencies = IndexMap::new();
    if let Some(items) = spec.ivar("dependencies").and_then(Value::as_array) {
        for dependency in items {
            if !is_runtime(dependency) {
                continue;
            }
            let dep_name = dependency
                .ivar("name")
                .and_then(Value::as_text)
                .ok_or_else(|| QuarryError::codec("dependency has no name"))?;
            let requirement = dependency
                .ivar("requirement")
                .or_else(|| dependency.ivar("version_requirements"))
                .map(collapse_requirement)
                .transpose()?
                .unwrap_or_else(|| ">= 0".to_string());
            dependencies.insert(dep_name.into_owned(), requirement);
        }
    }

    let optional = |field: &str| -> QuarryResult<Option<String>> {
        match spec.ivar(field) {
            None | Some(Value::Nil) => Ok(None),
            Some(requirement) => collapse_requirement(requirement).map(Some),
        }
    };

    Ok(PackageRecord::new(&*name, &version, &platform, checksum)?
        .with_dependencies(dependencies)
        .with_required_ruby_version(optional("required_ruby_version")?)
        .with_required_rubygems_version(optional("required_rubygems_version")?))
}

/// Dependencies without a type predate typed dependencies and are runtime
fn is_runtime(dependency: &Value) -> bool {
    match dependency.ivar("type") {
        Some(Value::Symbol(kind)) => kind == "runtime",
        Some(other) => other.as_text().map_or(true, |kind| kind.trim_start_matches(':') == "runtime"),
        None => true,
    }
}

fn version_text(value: &Value) -> QuarryResult<String> {
    match value {
        Value::Object { .. } => value
            .ivar("version")
            .map(version_text)
            .transpose()?
            .ok_or_else(|| QuarryError::codec("Gem::Version has no version")),
        Value::Int(number) => Ok(number.to_string()),
        Value::Float(number) => Ok(number.to_string()),
        other => other
            .as_text()
            .map(|text| text.into_owned())
            .ok_or_else(|| QuarryError::codec("version is not a string")),
    }
}

/// Collapse a `Gem::Requirement` into `op version&op version`
fn collapse_requirement(requirement: &Value) -> QuarryResult<String> {
    let clauses = requirement
        .ivar("requirements")
        .and_then(Value::as_array)
        .ok_or_else(|| QuarryError::codec("requirement has no clause list"))?;

    let mut rendered = Vec::with_capacity(clauses.len());
    for clause in clauses {
        match clause.as_array() {
            Some([op, version]) => {
                let op = op
                    .as_text()
                    .ok_or_else(|| QuarryError::codec("requirement operator is not a string"))?;
                rendered.push(format!("{} {}", op, version_text(version)?));
            },
            _ => return Err(QuarryError::codec("requirement clause is not a pair")),
        }
    }
    Ok(rendered.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::inflate;
    use crate::gem::GemBuilder;

    fn registry() -> ClassRegistry {
        ClassRegistry::rubygems()
    }

    #[test]
    fn test_extract_record() {
        let archive = GemBuilder::new("mygem", "1.2.0")
            .dependency("rake", ">= 13.0&< 14")
            .development_dependency("rspec", ">= 3")
            .required_ruby_version(">= 2.7")
            .file("lib/mygem.rb", b"module Mygem; end\n")
            .build()
            .unwrap();

        let extracted = extract(&archive, &registry()).unwrap();
        let record = &extracted.record;
        assert_eq!(record.name, "mygem");
        assert_eq!(record.version, "1.2.0");
        assert_eq!(record.platform, "ruby");
        assert_eq!(record.checksum, sha256_hex(&archive));
        assert!(!record.prerelease);
        assert_eq!(record.dependencies.len(), 1);
        assert_eq!(record.dependencies.get("rake").unwrap(), ">= 13.0&< 14");
        assert_eq!(record.required_ruby_version.as_deref(), Some(">= 2.7"));
        assert_eq!(record.required_rubygems_version.as_deref(), Some(">= 0"));
    }

    #[test]
    fn test_extract_platform_gem() {
        let archive = GemBuilder::new("native", "0.5.0.rc1")
            .platform("x86_64-linux")
            .build()
            .unwrap();
        let record = extract(&archive, &registry()).unwrap().record;
        assert_eq!(record.platform, "x86_64-linux");
        assert!(record.prerelease);
        assert_eq!(record.ext_version(), "0.5.0.rc1-x86_64-linux");
    }

    #[test]
    fn test_gemspec_is_marshal_specification() {
        let archive = GemBuilder::new("mygem", "1.0.0").build().unwrap();
        let extracted = extract(&archive, &registry()).unwrap();

        let bytes = inflate(&extracted.gemspec).unwrap();
        let value = marshal::load(&bytes, &registry()).unwrap();
        let data = match value {
            Value::UserDefined { class, data } => {
                assert_eq!(class, "Gem::Specification");
                data
            },
            other => panic!("unexpected {:?}", other),
        };

        let fields = marshal::load(&data, &registry()).unwrap();
        let fields = fields.as_array().unwrap().to_vec();
        assert_eq!(fields.len(), 19);
        assert_eq!(fields[2], Value::str("mygem"));
        // Date was removed before lowering
        assert_eq!(fields[4], Value::Nil);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let archive = GemBuilder::new("mygem", "1.0.0").build().unwrap();
        let first = extract(&archive, &registry()).unwrap();
        let second = extract(&archive, &registry()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_metadata() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(3);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "data.tar.gz", &b"abc"[..])
            .unwrap();
        let archive = builder.into_inner().unwrap();

        let err = extract(&archive, &registry()).unwrap_err();
        assert!(matches!(err, QuarryError::Codec { .. }));
        assert!(err.to_string().contains("metadata.gz"));
    }

    #[test]
    fn test_invalid_name_is_validation_error() {
        let archive = GemBuilder::new("bad name", "1.0.0").build().unwrap();
        assert!(matches!(
            extract(&archive, &registry()),
            Err(QuarryError::Validation { .. })
        ));
    }

    #[test]
    fn test_untyped_dependency_is_runtime() {
        let dependency = Value::object(
            "Gem::Dependency",
            vec![("@name".to_string(), Value::str("rack"))],
        );
        assert!(is_runtime(&dependency));
    }
}
