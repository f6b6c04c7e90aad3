//! Known Ruby classes and their wire layouts.
//!
//! The registry is built once and passed to every decode call. The reader
//! consults it to reject unknown classes; [`ClassRegistry::lower`] uses it
//! to turn objects decoded from YAML (plain ivars) into the layout Ruby
//! itself would dump for that class.

use std::collections::HashMap;

use quarry_core::{QuarryError, QuarryResult};

use super::{time, writer, Value};

/// How a class appears in a Marshal stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireForm {
    /// `o`: class name plus instance variables
    Object,
    /// `U`: class name plus the value returned by `marshal_dump`
    UserMarshal,
    /// `u`: class name plus the opaque bytes returned by `_dump`
    UserDefined,
}

/// Converts a class's ivars (already lowered) into its wire value
pub type Lowering = fn(&ClassRegistry, &str, Vec<(String, Value)>) -> QuarryResult<Value>;

#[derive(Clone, Copy)]
struct ClassDef {
    form: WireForm,
    lower: Option<Lowering>,
}

#[derive(Clone)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassDef>,
}

impl ClassRegistry {
    /// A registry that knows no classes
    pub fn empty() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// The classes found in RubyGems index files and gem metadata
    pub fn rubygems() -> Self {
        let mut registry = Self::empty();
        registry.register("Gem::Version", WireForm::UserMarshal, Some(lower_version));
        registry.register(
            "Gem::Requirement",
            WireForm::UserMarshal,
            Some(lower_requirement),
        );
        registry.register("Gem::Dependency", WireForm::Object, Some(lower_object));
        registry.register("Gem::Platform", WireForm::Object, Some(lower_object));
        registry.register(
            "Gem::Specification",
            WireForm::UserDefined,
            Some(lower_specification),
        );
        // Only ever produced by the specification lowering
        registry.register("Time", WireForm::UserDefined, None);
        registry
    }

    pub fn register(&mut self, class: &str, form: WireForm, lower: Option<Lowering>) {
        self.classes
            .insert(class.to_string(), ClassDef { form, lower });
    }

    pub fn is_known(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn form(&self, class: &str) -> Option<WireForm> {
        self.classes.get(class).map(|def| def.form)
    }

    /// Accept `class` in `form` or fail with a codec error
    pub fn check(&self, class: &str, form: WireForm) -> QuarryResult<()> {
        match self.form(class) {
            Some(expected) if expected == form => Ok(()),
            Some(expected) => Err(QuarryError::codec(format!(
                "class {} appears as {:?}, expected {:?}",
                class, form, expected
            ))),
            None => Err(QuarryError::codec(format!("unknown class {}", class))),
        }
    }

    /// Rewrite every plain object in `value` into its registered wire form
    pub fn lower(&self, value: Value) -> QuarryResult<Value> {
        match value {
            Value::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| self.lower(item))
                    .collect::<QuarryResult<_>>()?,
            )),
            Value::Hash(pairs) => Ok(Value::Hash(
                pairs
                    .into_iter()
                    .map(|(key, item)| Ok((self.lower(key)?, self.lower(item)?)))
                    .collect::<QuarryResult<_>>()?,
            )),
            Value::Object { class, ivars } => {
                let def = self
                    .classes
                    .get(&class)
                    .copied()
                    .ok_or_else(|| QuarryError::codec(format!("unknown class {}", class)))?;
                let lower = def.lower.ok_or_else(|| {
                    QuarryError::codec(format!("class {} cannot be built from fields", class))
                })?;
                let ivars = ivars
                    .into_iter()
                    .map(|(name, item)| Ok((name, self.lower(item)?)))
                    .collect::<QuarryResult<Vec<_>>>()?;
                lower(self, &class, ivars)
            },
            other => Ok(other),
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::rubygems()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.classes.keys().collect();
        names.sort();
        f.debug_struct("ClassRegistry").field("classes", &names).finish()
    }
}

fn take(ivars: &mut Vec<(String, Value)>, name: &str) -> Option<Value> {
    let idx = ivars
        .iter()
        .position(|(key, _)| key.strip_prefix('@') == Some(name))?;
    Some(ivars.remove(idx).1)
}

fn lower_object(_: &ClassRegistry, class: &str, ivars: Vec<(String, Value)>) -> QuarryResult<Value> {
    Ok(Value::object(class, ivars))
}

fn lower_version(
    _: &ClassRegistry,
    class: &str,
    mut ivars: Vec<(String, Value)>,
) -> QuarryResult<Value> {
    let version = take(&mut ivars, "version")
        .ok_or_else(|| QuarryError::codec("Gem::Version without a version field"))?;
    let version = match version {
        Value::Str(_) | Value::Bytes(_) => version,
        Value::Int(number) => Value::str(number.to_string()),
        Value::Float(number) => Value::str(format!("{:?}", number)),
        _ => return Err(QuarryError::codec("Gem::Version field is not text")),
    };
    Ok(Value::user_marshal(class, Value::Array(vec![version])))
}

fn lower_requirement(
    _: &ClassRegistry,
    class: &str,
    mut ivars: Vec<(String, Value)>,
) -> QuarryResult<Value> {
    let requirements = take(&mut ivars, "requirements").unwrap_or(Value::Array(Vec::new()));
    Ok(Value::user_marshal(class, Value::Array(vec![requirements])))
}

/// Field order of `Gem::Specification#_dump`
fn lower_specification(
    _: &ClassRegistry,
    class: &str,
    mut ivars: Vec<(String, Value)>,
) -> QuarryResult<Value> {
    let mut field = |name: &str| take(&mut ivars, name).unwrap_or(Value::Nil);

    let date = match field("date") {
        Value::Str(text) => time::parse_timestamp(&text)
            .map(|at| Value::UserDefined {
                class: "Time".to_string(),
                data: time::dump(&at),
            })
            .unwrap_or(Value::Nil),
        _ => Value::Nil,
    };
    let platform = field("platform");
    let original_platform = match field("original_platform") {
        Value::Nil => platform.clone(),
        other => other,
    };
    let new_platform = match field("new_platform") {
        Value::Nil => platform,
        other => other,
    };
    let specification_version = match field("specification_version") {
        Value::Nil => Value::Int(4),
        other => other,
    };
    let dependencies = match field("dependencies") {
        Value::Nil => Value::Array(Vec::new()),
        other => other,
    };

    let dumped = Value::Array(vec![
        field("rubygems_version"),
        specification_version,
        field("name"),
        field("version"),
        date,
        field("summary"),
        field("required_ruby_version"),
        field("required_rubygems_version"),
        original_platform,
        dependencies,
        // rubyforge_project
        Value::str(""),
        field("email"),
        field("authors"),
        field("description"),
        field("homepage"),
        // has_rdoc
        Value::Bool(true),
        new_platform,
        field("licenses"),
        field("metadata"),
    ]);

    Ok(Value::UserDefined {
        class: class.to_string(),
        data: writer::dump(&dumped),
    })
}
