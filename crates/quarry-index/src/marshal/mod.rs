//! Ruby Marshal 4.8 object model.
//!
//! The legacy index files and `.gemspec.rz` documents are Marshal dumps of a
//! small set of Ruby classes. This module models them as a closed [`Value`]
//! tree; which class names are accepted, and how each one is laid out on the
//! wire, is decided by an explicit [`ClassRegistry`] handed to the reader.

use std::borrow::Cow;

pub mod reader;
pub mod registry;
pub mod time;
pub mod writer;

pub use reader::load;
pub use registry::{ClassRegistry, WireForm};
pub use writer::dump;

/// Format version written at the start of every dump
pub const MAJOR_VERSION: u8 = 4;
pub const MINOR_VERSION: u8 = 8;

/// One node of a decoded object graph
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Symbol(String),
    /// String carrying an encoding (written with the `E` ivar)
    Str(String),
    /// String without an encoding ivar; usually ASCII-8BIT data
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Hash(Vec<(Value, Value)>),
    /// Plain object (`o`); ivar names include the leading `@`
    Object {
        class: String,
        ivars: Vec<(String, Value)>,
    },
    /// Object dumped through `marshal_dump` (`U`)
    UserMarshal { class: String, data: Box<Value> },
    /// Object dumped through `_dump` (`u`)
    UserDefined { class: String, data: Vec<u8> },
}

impl Value {
    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn object(class: impl Into<String>, ivars: Vec<(String, Value)>) -> Self {
        Value::Object {
            class: class.into(),
            ivars,
        }
    }

    pub fn user_marshal(class: impl Into<String>, data: Value) -> Self {
        Value::UserMarshal {
            class: class.into(),
            data: Box::new(data),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Text of a string value, whether or not it carried an encoding
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Str(text) => Some(Cow::Borrowed(text)),
            Value::Bytes(bytes) => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Class name of an object-like value
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Value::Object { class, .. }
            | Value::UserMarshal { class, .. }
            | Value::UserDefined { class, .. } => Some(class),
            _ => None,
        }
    }

    /// Instance variable of a plain object, looked up without the `@`
    pub fn ivar(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object { ivars, .. } => ivars
                .iter()
                .find(|(key, _)| key.strip_prefix('@') == Some(name))
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Remove an instance variable, returning it if present
    pub fn remove_ivar(&mut self, name: &str) -> Option<Value> {
        match self {
            Value::Object { ivars, .. } => {
                let idx = ivars
                    .iter()
                    .position(|(key, _)| key.strip_prefix('@') == Some(name))?;
                Some(ivars.remove(idx).1)
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
