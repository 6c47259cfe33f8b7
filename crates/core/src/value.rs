//! Attribute values, write-side field mappings and the removal/missing sentinels.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A stored row, as returned by the database.
pub type Item = HashMap<String, Value>;

/// Marks a field for removal from the stored item during an update.
pub const REMOVE_KEY: FieldValue = FieldValue::Remove;

/// Marks a field that was never set. It is left out of every write.
pub const MISSING_KEY: FieldValue = FieldValue::Missing;

/// A scalar attribute value.
///
/// Numbers keep the decimal text the database stores; comparisons between
/// numbers are numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "N")]
    Number(String),
    #[serde(rename = "S")]
    String(String),
    #[serde(rename = "B")]
    Binary(Vec<u8>),
}

impl Value {
    /// Builds a number value from its decimal text.
    pub fn number(text: impl Into<String>) -> Self {
        Value::Number(text.into())
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short type code as used by the database (`S`, `N`, `B`, `BOOL`, `NULL`).
    pub fn type_code(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Number(_) => "N",
            Value::String(_) => "S",
            Value::Binary(_) => "B",
        }
    }

    /// Orders two values the way the database does for key and filter
    /// comparisons. Values of different types are unordered; `false`
    /// orders before `true`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                let a: f64 = a.parse().ok()?;
                let b: f64 = b.parse().ok()?;
                a.partial_cmp(&b)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Equality with numeric semantics for numbers (`1` equals `1.0`).
    pub fn matches(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Converts a JSON scalar into a value. Arrays and objects are rejected.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => Ok(Value::Number(n.to_string())),
            serde_json::Value::String(s) => Ok(Value::String(s)),
            other => Err(CoreError::InvalidData(format!(
                "Only scalar values are supported, got {}",
                other
            ))),
        }
    }

    /// Converts the value into JSON. Binary values become arrays of bytes.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => n
                .parse::<serde_json::Number>()
                .map(serde_json::Value::Number)
                .unwrap_or_else(|_| serde_json::Value::String(n.clone())),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Binary(bytes) => serde_json::Value::Array(
                bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

macro_rules! impl_number_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n.to_string())
                }
            }

            impl From<$t> for FieldValue {
                fn from(n: $t) -> Self {
                    FieldValue::Set(Value::from(n))
                }
            }
        )*
    };
}

impl_number_from!(i32, i64, u32, u64, usize);

/// Only finite floats are numbers the database accepts.
impl TryFrom<f64> for Value {
    type Error = CoreError;

    fn try_from(n: f64) -> Result<Self> {
        if n.is_finite() {
            Ok(Value::Number(n.to_string()))
        } else {
            Err(CoreError::InvalidData(format!("Not a finite number: {}", n)))
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

/// A value on the write side: a new value, or one of the two sentinels.
///
/// Sentinels are compared by variant, so cloning one keeps it the same sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Set(Value),
    /// The field is deleted from the stored item.
    Remove,
    /// The field was never set and is left out of writes.
    Missing,
}

impl FieldValue {
    pub fn is_remove(&self) -> bool {
        matches!(self, FieldValue::Remove)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Returns the value when this is neither sentinel.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Set(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Set(value)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Set(Value::from(s))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Set(Value::from(s))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Set(Value::from(b))
    }
}

/// A typed record field that may be unset or marked for removal.
///
/// Typed records use this where a plain map would hold a sentinel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field<T> {
    Set(T),
    Remove,
    #[default]
    Missing,
}

impl<T> Field<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Field::Set(v) => Some(v),
            _ => None,
        }
    }

}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Set(v),
            None => Field::Missing,
        }
    }
}

impl<T: Into<Value>> From<Field<T>> for FieldValue {
    fn from(field: Field<T>) -> Self {
        match field {
            Field::Set(v) => FieldValue::Set(v.into()),
            Field::Remove => FieldValue::Remove,
            Field::Missing => FieldValue::Missing,
        }
    }
}

/// Insertion-ordered mapping of field name to [`FieldValue`].
///
/// The order decides placeholder numbering when an update is built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field. A replaced field keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Builder-style [`Fields::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Drops every field holding [`MISSING_KEY`].
    pub fn without_missing(mut self) -> Self {
        self.entries.retain(|(_, v)| !v.is_missing());
        self
    }

    /// Converts into a storable item. Sentinel fields are dropped.
    pub fn into_item(self) -> Item {
        self.entries
            .into_iter()
            .filter_map(|(k, v)| match v {
                FieldValue::Set(value) => Some((k, value)),
                FieldValue::Remove | FieldValue::Missing => None,
            })
            .collect()
    }

    /// Builds fields from a JSON object of scalars, in the object's iteration order.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, FieldValue::Set(Value::from_json(v)?))))
                .collect(),
            other => Err(CoreError::InvalidData(format!(
                "Expected a JSON object, got {}",
                other
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<Item> for Fields {
    fn from(item: Item) -> Self {
        let mut entries: Vec<(String, FieldValue)> = item
            .into_iter()
            .map(|(k, v)| (k, FieldValue::Set(v)))
            .collect();
        // HashMap order is arbitrary; sort so placeholder numbering is stable.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }
}
