//! Normalized data model for marketing payloads.
//!
//! This module provides:
//! - `Value`, the uniform Scalar/Sequence/Mapping representation shared by
//!   the JSON normalizer and the template renderer
//! - `normalize`, converting raw JSON text into a `Value` tree

mod normalize;

pub use normalize::{normalize, NormalizeError, NormalizeResult};

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Number;

/// A normalized data value resolved against by template placeholders.
///
/// Every value is exactly one variant; nesting depth is bounded only by the
/// input size.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Opaque leaf, printed via its natural string form
    Scalar(Scalar),
    /// Ordered list, mirrors source array order
    Sequence(Vec<Value>),
    /// Keyed collection, unique keys, lookup by key
    Mapping(BTreeMap<String, Value>),
}

/// Leaf value kinds, preserving the source JSON type.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
    Bool(bool),
    Null,
}

impl Value {
    /// Look up a mapping entry by key. Returns `None` for non-mappings.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Look up a sequence element by index. Returns `None` for non-sequences.
    pub fn index(&self, idx: usize) -> Option<&Value> {
        match self {
            Value::Sequence(items) => items.get(idx),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(Scalar::Null))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Scalar(Scalar::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Convert back into a `serde_json::Value` with the same structural shape.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Scalar(Scalar::Text(s)) => serde_json::Value::String(s.clone()),
            Value::Scalar(Scalar::Number(n)) => serde_json::Value::Number(n.clone()),
            Value::Scalar(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
            Value::Scalar(Scalar::Null) => serde_json::Value::Null,
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Natural string form; `Null` prints as the empty string.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => Ok(()),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Text(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Text(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Number(Number::from(n)))
    }
}
