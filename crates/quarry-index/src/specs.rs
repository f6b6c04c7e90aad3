//! Legacy binary index (`specs.4.8`, `latest_specs.4.8`,
//! `prerelease_specs.4.8`).
//!
//! Each file is a Marshal array of `[name, Gem::Version, platform]`
//! triples. The codec works on decompressed bytes; the `.gz` layer is
//! handled by [`crate::compress`].

use quarry_core::{PackageKey, QuarryError, QuarryResult, DEFAULT_PLATFORM};

use crate::compress;
use crate::marshal::{self, ClassRegistry, Value};

const VERSION_CLASS: &str = "Gem::Version";
const PLATFORM_CLASS: &str = "Gem::Platform";

/// Decode a binary index into its entries, preserving order
pub fn decode(bytes: &[u8], registry: &ClassRegistry) -> QuarryResult<Vec<PackageKey>> {
    let document = marshal::load(bytes, registry)?;
    let items = document
        .as_array()
        .ok_or_else(|| QuarryError::codec("spec index is not an array"))?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            decode_entry(item)
                .map_err(|e| QuarryError::codec(format!("spec index entry {}: {}", idx, e)))
        })
        .collect()
}

/// Decode a spec index file that may or may not be gzip-compressed
pub fn decode_file_bytes(bytes: &[u8], registry: &ClassRegistry) -> QuarryResult<Vec<PackageKey>> {
    if compress::is_gzip(bytes) {
        decode(&compress::gunzip(bytes)?, registry)
    } else {
        decode(bytes, registry)
    }
}

/// Encode entries as an uncompressed binary index
pub fn encode(entries: &[PackageKey]) -> Vec<u8> {
    let items = entries
        .iter()
        .map(|entry| {
            Value::Array(vec![
                Value::str(entry.name.as_str()),
                version_value(&entry.version),
                Value::str(entry.platform.as_str()),
            ])
        })
        .collect();
    marshal::dump(&Value::Array(items))
}

/// `Gem::Version` wrapper as written by `Gem::Version#marshal_dump`
pub fn version_value(version: &str) -> Value {
    Value::user_marshal(VERSION_CLASS, Value::Array(vec![Value::str(version)]))
}

fn decode_entry(item: &Value) -> QuarryResult<PackageKey> {
    let fields = match item.as_array() {
        Some(fields) if fields.len() == 3 => fields,
        _ => return Err(QuarryError::codec("expected a [name, version, platform] triple")),
    };

    let name = fields[0]
        .as_text()
        .ok_or_else(|| QuarryError::codec("gem name is not a string"))?;
    let version = decode_version(&fields[1])?;
    let platform = decode_platform(&fields[2])?;

    Ok(PackageKey::new(name, version, platform))
}

fn decode_version(value: &Value) -> QuarryResult<String> {
    match value {
        Value::UserMarshal { class, data } if class == VERSION_CLASS => data
            .as_array()
            .and_then(|fields| fields.first())
            .and_then(Value::as_text)
            .map(|text| text.into_owned())
            .ok_or_else(|| QuarryError::codec("Gem::Version holds no version string")),
        other => other
            .as_text()
            .map(|text| text.into_owned())
            .ok_or_else(|| QuarryError::codec("version is not a Gem::Version")),
    }
}

/// Platform is usually a string; older indexes hold `Gem::Platform` objects
pub(crate) fn decode_platform(value: &Value) -> QuarryResult<String> {
    match value {
        Value::Nil => Ok(DEFAULT_PLATFORM.to_string()),
        Value::Object { class, .. } if class == PLATFORM_CLASS => {
            let part = |name: &str| {
                value
                    .ivar(name)
                    .and_then(Value::as_text)
                    .map(|text| text.into_owned())
            };
            let rendered: Vec<String> = [part("cpu"), part("os"), part("version")]
                .into_iter()
                .flatten()
                .collect();
            if rendered.is_empty() {
                Ok(DEFAULT_PLATFORM.to_string())
            } else {
                Ok(rendered.join("-"))
            }
        },
        other => other
            .as_text()
            .map(|text| text.into_owned())
            .ok_or_else(|| QuarryError::codec("platform is not a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(name: &str, version: &str, platform: &str) -> PackageKey {
        PackageKey::new(name, version, platform)
    }

    #[test]
    fn test_encode_decode_preserves_order() {
        let entries = vec![
            key("rake", "13.0.6", "ruby"),
            key("nokogiri", "1.16.0", "x86_64-linux"),
            key("abbrev", "0.1.2", "ruby"),
        ];
        let registry = ClassRegistry::rubygems();
        let bytes = encode(&entries);
        assert_eq!(decode(&bytes, &registry).unwrap(), entries);
    }

    #[test]
    fn test_decode_ruby_output_with_links() {
        // [["a", U:Gem::Version["1"], "ruby"], ["b", U:Gem::Version["2"], @6]]
        // Objects: 0 outer, 1 first triple, 2 "a", 3 version, 4 its array,
        // 5 "1", 6 "ruby", 7 second triple, 8 "b", ...
        let mut bytes = vec![4, 8];
        bytes.extend_from_slice(b"[\x07");
        bytes.extend_from_slice(b"[\x08\"\x06aU:\x11Gem::Version[\x06\"\x061\"\x09ruby");
        bytes.extend_from_slice(b"[\x08\"\x06bU;\x00[\x06\"\x062@\x0b");
        let entries = decode(&bytes, &ClassRegistry::rubygems()).unwrap();
        assert_eq!(
            entries,
            vec![key("a", "1", "ruby"), key("b", "2", "ruby")]
        );
    }

    #[test]
    fn test_decode_platform_object() {
        let platform = Value::object(
            "Gem::Platform",
            vec![
                ("@cpu".to_string(), Value::str("x86")),
                ("@os".to_string(), Value::str("mingw32")),
                ("@version".to_string(), Value::Nil),
            ],
        );
        assert_eq!(decode_platform(&platform).unwrap(), "x86-mingw32");
        assert_eq!(decode_platform(&Value::Nil).unwrap(), "ruby");
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        let registry = ClassRegistry::rubygems();
        let not_array = marshal::dump(&Value::str("specs"));
        assert!(decode(&not_array, &registry).is_err());

        let short = marshal::dump(&Value::Array(vec![Value::Array(vec![Value::str("a")])]));
        assert!(decode(&short, &registry).is_err());

        let mut truncated = encode(&[key("rake", "13.0.6", "ruby")]);
        truncated.truncate(truncated.len() - 3);
        assert!(decode(&truncated, &registry).is_err());
    }

    #[test]
    fn test_decode_file_bytes_sniffs_gzip() {
        let registry = ClassRegistry::rubygems();
        let entries = vec![key("rake", "13.0.6", "ruby")];
        let plain = encode(&entries);
        let packed = compress::gzip(&plain).unwrap();
        assert_eq!(decode_file_bytes(&packed, &registry).unwrap(), entries);
        assert_eq!(decode_file_bytes(&plain, &registry).unwrap(), entries);
    }

    proptest! {
        #[test]
        fn round_trip(
            entries in prop::collection::vec(
                ("[a-z][a-z0-9_-]{0,10}", "[0-9]{1,2}(\\.[0-9a-z]{1,3}){0,3}", "ruby|java|x86_64-linux"),
                0..20,
            )
        ) {
            let keys: Vec<PackageKey> = entries
                .iter()
                .map(|(n, v, p)| key(n, v, p))
                .collect();
            let decoded = decode(&encode(&keys), &ClassRegistry::rubygems()).unwrap();
            prop_assert_eq!(decoded, keys);
        }
    }
}
