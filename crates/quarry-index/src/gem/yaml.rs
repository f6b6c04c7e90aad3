//! Gem metadata YAML.
//!
//! `metadata.gz` inside a `.gem` is a Psych dump of a `Gem::Specification`.
//! Tagged mappings (`!ruby/object:<Class>`) become [`Value::Object`] nodes
//! with `@`-prefixed ivars; the class must be known to the registry.

use quarry_core::{QuarryError, QuarryResult};
use serde_yaml_ng::Value as Yaml;

use crate::marshal::{ClassRegistry, Value};

const OBJECT_TAG: &str = "ruby/object:";

/// Parse a metadata document into the Marshal object model
pub fn load(text: &str, registry: &ClassRegistry) -> QuarryResult<Value> {
    let document: Yaml = serde_yaml_ng::from_str(text)
        .map_err(|e| QuarryError::codec(format!("invalid gem metadata YAML: {}", e)))?;
    convert(document, registry)
}

fn convert(node: Yaml, registry: &ClassRegistry) -> QuarryResult<Value> {
    match node {
        Yaml::Null => Ok(Value::Nil),
        Yaml::Bool(flag) => Ok(Value::Bool(flag)),
        Yaml::Number(number) => Ok(match number.as_i64() {
            Some(int) => Value::Int(int),
            None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
        }),
        Yaml::String(text) => Ok(scalar(text)),
        Yaml::Sequence(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(|item| convert(item, registry))
                .collect::<QuarryResult<_>>()?,
        )),
        Yaml::Mapping(mapping) => Ok(Value::Hash(
            mapping
                .into_iter()
                .map(|(key, item)| Ok((convert(key, registry)?, convert(item, registry)?)))
                .collect::<QuarryResult<_>>()?,
        )),
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let class = tag
                .trim_start_matches('!')
                .strip_prefix(OBJECT_TAG)
                .ok_or_else(|| QuarryError::codec(format!("unsupported YAML tag {}", tag)))?
                .to_string();
            if !registry.is_known(&class) {
                return Err(QuarryError::codec(format!("unknown class {}", class)));
            }

            let ivars = match tagged.value {
                Yaml::Mapping(mapping) => mapping
                    .into_iter()
                    .map(|(key, item)| {
                        let key = match key {
                            Yaml::String(key) => key,
                            _ => {
                                return Err(QuarryError::codec(format!(
                                    "{} has a non-string field name",
                                    class
                                )))
                            },
                        };
                        Ok((format!("@{}", key), convert(item, registry)?))
                    })
                    .collect::<QuarryResult<Vec<_>>>()?,
                Yaml::Null => Vec::new(),
                _ => {
                    return Err(QuarryError::codec(format!(
                        "{} is not a mapping",
                        class
                    )))
                },
            };
            Ok(Value::Object { class, ivars })
        },
    }
}

/// Psych writes symbols as plain `:name` scalars
fn scalar(text: String) -> Value {
    match text.strip_prefix(':') {
        Some(name) if is_symbol_name(name) => Value::Symbol(name.to_string()),
        _ => Value::Str(text),
    }
}

fn is_symbol_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    let body = name.trim_end_matches(['?', '!', '=']);
    first_ok && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
