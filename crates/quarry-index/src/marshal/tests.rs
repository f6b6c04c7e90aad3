use super::*;
use proptest::prelude::*;

fn registry() -> ClassRegistry {
    ClassRegistry::rubygems()
}

fn with_header(body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![4, 8];
    bytes.extend_from_slice(body);
    bytes
}

#[test]
fn test_fixnum_wire_forms() {
    // Byte sequences produced by Ruby's Marshal.dump
    let cases: &[(i64, &[u8])] = &[
        (0, b"i\x00"),
        (1, b"i\x06"),
        (-1, b"i\xfa"),
        (122, b"i\x7f"),
        (123, b"i\x01\x7b"),
        (-123, b"i\x80"),
        (-124, b"i\xff\x84"),
        (256, b"i\x02\x00\x01"),
        (-257, b"i\xfe\xff\xfe"),
        (1 << 30, b"l+\x07\x00\x00\x00\x40"),
    ];

    for (number, body) in cases {
        let expected = with_header(body);
        assert_eq!(dump(&Value::Int(*number)), expected, "dump {}", number);
        assert_eq!(
            load(&expected, &registry()).unwrap(),
            Value::Int(*number),
            "load {}",
            number
        );
    }
}

#[test]
fn test_string_encodings() {
    let utf8 = with_header(b"I\"\x08abc\x06:\x06ET");
    assert_eq!(dump(&Value::str("abc")), utf8);
    assert_eq!(load(&utf8, &registry()).unwrap(), Value::str("abc"));

    let raw = with_header(b"\"\x08abc");
    assert_eq!(
        load(&raw, &registry()).unwrap(),
        Value::Bytes(b"abc".to_vec())
    );

    // US-ASCII strings carry E=false and are still text
    let ascii = with_header(b"I\"\x08abc\x06:\x06EF");
    assert_eq!(load(&ascii, &registry()).unwrap(), Value::str("abc"));
}

#[test]
fn test_gem_version_bytes() {
    let version = Value::user_marshal("Gem::Version", Value::Array(vec![Value::str("1.0")]));
    let expected = with_header(b"U:\x11Gem::Version[\x06I\"\x081.0\x06:\x06ET");
    assert_eq!(dump(&version), expected);
    assert_eq!(load(&expected, &registry()).unwrap(), version);
}

#[test]
fn test_symbol_links() {
    let value = Value::Array(vec![Value::symbol("a"), Value::symbol("a")]);
    let bytes = dump(&value);
    assert_eq!(bytes, with_header(b"[\x07:\x06a;\x00"));
    assert_eq!(load(&bytes, &registry()).unwrap(), value);
}

#[test]
fn test_object_links() {
    // ["ruby", <link to "ruby">]: the array is object 0, the string object 1
    let bytes = with_header(b"[\x07I\"\x09ruby\x06:\x06ET@\x06");
    let value = load(&bytes, &registry()).unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::str("ruby"), Value::str("ruby")])
    );
}

#[test]
fn test_object_link_after_user_marshal() {
    // [U:Gem::Version["1"], @1]; the U object registers before its data
    let bytes = with_header(b"[\x07U:\x11Gem::Version[\x06I\"\x061\x06:\x06ET@\x06");
    let value = load(&bytes, &registry()).unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items[0], items[1]);
    assert_eq!(items[1].class_name(), Some("Gem::Version"));
}

#[test]
fn test_hash_and_object() {
    let value = Value::Array(vec![
        Value::Hash(vec![(Value::str("key"), Value::Nil)]),
        Value::object(
            "Gem::Dependency",
            vec![
                ("@name".to_string(), Value::str("rake")),
                ("@type".to_string(), Value::symbol("runtime")),
                ("@prerelease".to_string(), Value::Bool(false)),
            ],
        ),
        Value::Float(1.5),
        Value::Int(-(1 << 40)),
    ]);
    let bytes = dump(&value);
    assert_eq!(load(&bytes, &registry()).unwrap(), value);
}

#[test]
fn test_ivar_lookup() {
    let mut value = Value::object(
        "Gem::Platform",
        vec![
            ("@cpu".to_string(), Value::str("x86_64")),
            ("@os".to_string(), Value::str("linux")),
        ],
    );
    assert_eq!(value.ivar("os"), Some(&Value::str("linux")));
    assert_eq!(value.remove_ivar("cpu"), Some(Value::str("x86_64")));
    assert!(value.ivar("cpu").is_none());
}

#[test]
fn test_rejects_malformed_input() {
    let registry = registry();
    // Truncated string
    assert!(load(&with_header(b"\"\x08ab"), &registry).is_err());
    // Unknown tag
    assert!(load(&with_header(b"S:\x06A\x00"), &registry).is_err());
    // Wrong header
    assert!(load(&[4, 9, b'0'], &registry).is_err());
    // Trailing garbage
    assert!(load(&with_header(b"00"), &registry).is_err());
    // Empty
    assert!(load(&[], &registry).is_err());
    // Dangling link
    assert!(load(&with_header(b"@\x06"), &registry).is_err());
}

#[test]
fn test_rejects_unknown_class() {
    let bytes = with_header(b"U:\x09Evil[\x00");
    let err = load(&bytes, &registry()).unwrap_err();
    assert!(err.to_string().contains("unknown class Evil"));

    // Known class in the wrong layout
    let bytes = with_header(b"o:\x11Gem::Version\x00");
    assert!(load(&bytes, &registry()).is_err());

    // Nothing is known to an empty registry
    let bytes = dump(&Value::user_marshal("Gem::Version", Value::Array(vec![])));
    assert!(load(&bytes, &ClassRegistry::empty()).is_err());
}

#[test]
fn test_lower_yaml_objects() {
    let registry = registry();
    let requirement = Value::object(
        "Gem::Requirement",
        vec![(
            "@requirements".to_string(),
            Value::Array(vec![Value::Array(vec![
                Value::str(">="),
                Value::object("Gem::Version", vec![("@version".to_string(), Value::str("0"))]),
            ])]),
        )],
    );

    let lowered = registry.lower(requirement).unwrap();
    let expected = Value::user_marshal(
        "Gem::Requirement",
        Value::Array(vec![Value::Array(vec![Value::Array(vec![
            Value::str(">="),
            Value::user_marshal("Gem::Version", Value::Array(vec![Value::str("0")])),
        ])])]),
    );
    assert_eq!(lowered, expected);

    let unknown = Value::object("Evil::Thing", Vec::new());
    assert!(registry.lower(unknown).is_err());
}

#[test]
fn test_lower_specification_layout() {
    let registry = registry();
    let spec = Value::object(
        "Gem::Specification",
        vec![
            ("@name".to_string(), Value::str("mygem")),
            (
                "@version".to_string(),
                Value::object("Gem::Version", vec![("@version".to_string(), Value::str("1.0.0"))]),
            ),
            ("@platform".to_string(), Value::str("ruby")),
            ("@rubygems_version".to_string(), Value::str("3.4.10")),
        ],
    );

    let lowered = registry.lower(spec).unwrap();
    let data = match lowered {
        Value::UserDefined { class, data } => {
            assert_eq!(class, "Gem::Specification");
            data
        },
        other => panic!("unexpected {:?}", other),
    };

    let fields = load(&data, &registry).unwrap();
    let fields = fields.as_array().unwrap();
    assert_eq!(fields.len(), 19);
    assert_eq!(fields[0], Value::str("3.4.10"));
    assert_eq!(fields[1], Value::Int(4));
    assert_eq!(fields[2], Value::str("mygem"));
    assert_eq!(fields[3].class_name(), Some("Gem::Version"));
    assert_eq!(fields[4], Value::Nil);
    assert_eq!(fields[8], Value::str("ruby"));
    assert_eq!(fields[9], Value::Array(Vec::new()));
    assert_eq!(fields[15], Value::Bool(true));
    assert_eq!(fields[16], Value::str("ruby"));
}

#[test]
fn test_lower_specification_date() {
    let spec = Value::object(
        "Gem::Specification",
        vec![(
            "@date".to_string(),
            Value::str("2024-01-15 00:00:00.000000000 Z"),
        )],
    );
    let registry = registry();
    let Value::UserDefined { data, .. } = registry.lower(spec).unwrap() else {
        panic!("specification must lower to _dump form");
    };
    let fields = load(&data, &registry).unwrap();
    match &fields.as_array().unwrap()[4] {
        Value::UserDefined { class, data } => {
            assert_eq!(class, "Time");
            assert_eq!(data.len(), 8);
        },
        other => panic!("unexpected date {:?}", other),
    }
}

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z_]{1,8}".prop_map(Value::Symbol),
        "\\PC{0,12}".prop_map(Value::Str),
        prop::collection::vec(any::<u8>(), 0..12).prop_map(Value::Bytes),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((inner.clone(), inner.clone()), 0..4).prop_map(Value::Hash),
            inner.prop_map(|data| Value::user_marshal("Gem::Version", data)),
        ]
    })
}

proptest! {
    #[test]
    fn dump_then_load_is_identity(value in value_strategy()) {
        let bytes = dump(&value);
        prop_assert_eq!(load(&bytes, &registry()).unwrap(), value);
    }
}
