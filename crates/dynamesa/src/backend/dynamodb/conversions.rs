//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between SDK types and `dynamesa_core` types.
//! These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{self as sdk, AttributeValue};
use chrono::{DateTime, Utc};
use dynamesa_core::{
    IndexKind, Item, KeyElement, KeySchema, KeyType, TableDescription, TableSchema, TableStatus,
    Value,
};

use crate::error::{Error, Result};

// ============================================================================
// Values
// ============================================================================

pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.clone()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Binary(bytes) => AttributeValue::B(Blob::new(bytes.clone())),
    }
}

pub fn from_attribute_value(name: &str, value: AttributeValue) -> Result<Value> {
    match value {
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Bool(b) => Ok(Value::Bool(b)),
        AttributeValue::N(n) => Ok(Value::Number(n)),
        AttributeValue::S(s) => Ok(Value::String(s)),
        AttributeValue::B(blob) => Ok(Value::Binary(blob.into_inner())),
        other => Err(Error::InvalidData(format!(
            "Unsupported attribute type for {}: {:?}",
            name, other
        ))),
    }
}

/// Convert an item to an attribute map.
pub fn to_attribute_map(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(k, v)| (k.clone(), to_attribute_value(v)))
        .collect()
}

/// Convert an attribute map to an item.
pub fn from_attribute_map(map: HashMap<String, AttributeValue>) -> Result<Item> {
    map.into_iter()
        .map(|(k, v)| {
            let value = from_attribute_value(&k, v)?;
            Ok((k, value))
        })
        .collect()
}

/// The SDK rejects empty placeholder maps, so they are sent as absent.
pub fn non_empty<K, V>(map: HashMap<K, V>) -> Option<HashMap<K, V>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

// ============================================================================
// Table descriptions
// ============================================================================

fn key_schema_from_sdk(elements: &[sdk::KeySchemaElement]) -> Result<KeySchema> {
    let elements = elements
        .iter()
        .map(|element| KeyElement {
            name: element.attribute_name().to_string(),
            key_type: match element.key_type() {
                sdk::KeyType::Range => KeyType::Range,
                _ => KeyType::Hash,
            },
        })
        .collect();
    Ok(KeySchema::from_elements(elements)?)
}

fn status_from_sdk(status: Option<&sdk::TableStatus>) -> TableStatus {
    match status {
        Some(sdk::TableStatus::Active) => TableStatus::Active,
        Some(sdk::TableStatus::Creating) => TableStatus::Creating,
        Some(sdk::TableStatus::Updating) => TableStatus::Updating,
        Some(sdk::TableStatus::Deleting) => TableStatus::Deleting,
        Some(other) => TableStatus::Other(other.as_str().to_string()),
        None => TableStatus::Other("UNKNOWN".to_string()),
    }
}

fn datetime_from_sdk(dt: &aws_sdk_dynamodb::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

/// Convert a DescribeTable response into a description.
pub fn description_from_sdk(table: &sdk::TableDescription) -> Result<TableDescription> {
    let table_name = table
        .table_name()
        .ok_or_else(|| Error::InvalidData("Table description without a name".to_string()))?;

    let mut schema = TableSchema::new(key_schema_from_sdk(table.key_schema())?);
    let mut indexes_active = true;

    for gsi in table.global_secondary_indexes() {
        let name = gsi.index_name().unwrap_or_default();
        schema = schema.with_index(name, IndexKind::Global, key_schema_from_sdk(gsi.key_schema())?);
        if !matches!(gsi.index_status(), Some(sdk::IndexStatus::Active) | None) {
            indexes_active = false;
        }
    }

    for lsi in table.local_secondary_indexes() {
        let name = lsi.index_name().unwrap_or_default();
        schema = schema.with_index(name, IndexKind::Local, key_schema_from_sdk(lsi.key_schema())?);
    }

    Ok(TableDescription {
        table_name: table_name.to_string(),
        schema,
        status: status_from_sdk(table.table_status()),
        indexes_active,
        created_at: table.creation_date_time().and_then(datetime_from_sdk),
        item_count: table.item_count().unwrap_or_default(),
    })
}
