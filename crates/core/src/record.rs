//! The record capability: how a caller's row type maps to and from fields.
//!
//! Plain maps ([`Item`], [`Fields`]) implement [`Record`] directly. Typed
//! structs implement it by hand with the getters below, using
//! [`Field`](crate::Field) for attributes that may be unset or removed.

use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::value::{Fields, Item, Value};

/// A row shape the table layer can read and write.
pub trait Record: Sized + Send + 'static {
    /// Field mapping used for writes and updates.
    fn to_fields(&self) -> Result<Fields>;

    /// Builds the record from a stored row.
    fn from_item(item: Item) -> Result<Self>;

    /// Applies a removal that an update just scheduled for `field`.
    fn mark_removed(&mut self, field: &str);
}

impl Record for Item {
    fn to_fields(&self) -> Result<Fields> {
        Ok(Fields::from(self.clone()))
    }

    fn from_item(item: Item) -> Result<Self> {
        Ok(item)
    }

    fn mark_removed(&mut self, field: &str) {
        self.remove(field);
    }
}

impl Record for Fields {
    fn to_fields(&self) -> Result<Fields> {
        Ok(self.clone())
    }

    fn from_item(item: Item) -> Result<Self> {
        Ok(Fields::from(item))
    }

    fn mark_removed(&mut self, field: &str) {
        self.remove(field);
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get a required string attribute.
pub fn get_string(item: &Item, key: &str) -> Result<String> {
    get_optional_string(item, key)
        .ok_or_else(|| CoreError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get an optional string attribute.
pub fn get_optional_string(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Get a required number attribute, parsed into `T`.
pub fn get_number<T: FromStr>(item: &Item, key: &str) -> Result<T> {
    get_optional_number(item, key)?
        .ok_or_else(|| CoreError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get an optional number attribute. Present but unparseable is an error.
pub fn get_optional_number<T: FromStr>(item: &Item, key: &str) -> Result<Option<T>> {
    match item.get(key) {
        Some(Value::Number(n)) => n
            .parse()
            .map(Some)
            .map_err(|_| CoreError::InvalidData(format!("Invalid number {}: {}", key, n))),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(CoreError::InvalidData(format!(
            "Expected a number for {}, got {}",
            key,
            other.type_code()
        ))),
    }
}

/// Get an optional boolean attribute.
pub fn get_optional_bool(item: &Item, key: &str) -> Option<bool> {
    item.get(key).and_then(Value::as_bool)
}
