//! Runtime values produced by decoders and bound into the parse context.
//!
//! Decoders turn tokens into [`Value`]s; the context binds them by field
//! path. Optional (pointer-like) fields are modeled by the presence or
//! absence of a binding rather than by a dedicated variant, which preserves
//! the distinction between "unset" and "explicitly set to empty".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::TypeSpec;

/// A decoded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The zero value for a semantic type, used when resetting fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use arg_grammar_core::{TypeSpec, Value};
    ///
    /// assert_eq!(Value::zero_of(&TypeSpec::Bool), Value::Bool(false));
    /// assert_eq!(Value::zero_of(&TypeSpec::Int), Value::Int(0));
    /// assert_eq!(
    ///     Value::zero_of(&TypeSpec::List(Box::new(TypeSpec::String))),
    ///     Value::List(vec![])
    /// );
    /// ```
    pub fn zero_of(ty: &TypeSpec) -> Value {
        match ty.unwrapped() {
            TypeSpec::Bool => Value::Bool(false),
            TypeSpec::Int => Value::Int(0),
            TypeSpec::Float => Value::Float(0.0),
            TypeSpec::String | TypeSpec::Custom(_) | TypeSpec::Record(_) => {
                Value::Str(String::new())
            }
            TypeSpec::List(_) => Value::List(Vec::new()),
            TypeSpec::Map(_) => Value::Map(BTreeMap::new()),
            TypeSpec::Optional(_) => unreachable!("unwrapped() strips Optional"),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Variant name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Renders the value the way enum membership is checked: scalars as their
    /// literal text, without quoting.
    pub fn literal(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::literal)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{k}={}", v.literal()))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero_of(&TypeSpec::String), Value::Str(String::new()));
        assert_eq!(
            Value::zero_of(&TypeSpec::Optional(Box::new(TypeSpec::Int))),
            Value::Int(0)
        );
        assert_eq!(
            Value::zero_of(&TypeSpec::Map(Box::new(TypeSpec::String))),
            Value::Map(BTreeMap::new())
        );
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Int(7).as_float(), Some(7.0));
        assert_eq!(Value::Str("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Bool(true).as_int(), None);
    }

    #[test]
    fn test_literal_rendering() {
        let list = Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]);
        assert_eq!(list.literal(), "a,b");
        assert_eq!(Value::Bool(false).literal(), "false");
    }
}
