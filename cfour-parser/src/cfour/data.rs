//! Extracted field values
//!
//! Field extractors produce schema-free nested data: numbers, strings, sequences and
//! records. [`Value`] keeps that nesting while staying typed, and [`DataMap`] is the
//! record type attached to every region. Keys are kept sorted so that serialized
//! output is stable between runs over the same log.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to value mapping carried by a region.
pub type DataMap = BTreeMap<String, Value>;

/// A single extracted value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(DataMap),
}

impl Value {
    /// Numeric view of the value; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DataMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is a record.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Follow a path of record keys, e.g. `["energy", "total", "au"]`.
    pub fn path(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().try_fold(self, |value, key| value.get(key))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Map(map) => write!(f, "{{{} fields}}", map.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<DataMap> for Value {
    fn from(map: DataMap) -> Self {
        Value::Map(map)
    }
}

/// Build a record from `(key, value)` pairs.
///
/// ```rust,ignore
/// let energy = record([("au", Value::from(-76.02))]);
/// ```
pub fn record<K, I>(pairs: I) -> DataMap
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Read a 3-vector record (`x`, `y`, `z`).
pub fn xyz(x: f64, y: f64, z: f64) -> Value {
    Value::Map(record([
        ("x", Value::from(x)),
        ("y", Value::from(y)),
        ("z", Value::from(z)),
    ]))
}
