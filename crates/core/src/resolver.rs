//! Classifies supplied fields into key fields and everything else.

use crate::error::{CoreError, Result};
use crate::schema::KeySchema;
use crate::value::{FieldValue, Fields, Item, Value};

/// Resolves the full key for a single-item read.
///
/// Every key attribute must be present with a value, and nothing else may be
/// supplied.
pub fn resolve_get_key(table: &str, key_schema: &KeySchema, fields: Fields) -> Result<Item> {
    let mut fields = fields.without_missing();
    let mut key = Item::new();

    for element in key_schema.elements() {
        match fields.remove(&element.name) {
            Some(FieldValue::Set(value)) => {
                key.insert(element.name.clone(), value);
            }
            _ => {
                return Err(CoreError::MissingKeyField {
                    operation: "table.get",
                    key_type: element.key_type.as_str(),
                    field: element.name.clone(),
                    table: table.to_string(),
                });
            }
        }
    }

    if !fields.is_empty() {
        return Err(CoreError::UnexpectedField {
            operation: "table.get",
            fields: fields.keys().map(str::to_string).collect(),
        });
    }

    Ok(key)
}

/// Splits filters into the ones addressing the index key and the rest.
///
/// Never fails: fields outside the key schema become post-filter fields.
pub fn split_key_fields(
    key_schema: &KeySchema,
    filters: Vec<(String, Value)>,
) -> (Vec<(String, Value)>, Vec<(String, Value)>) {
    filters
        .into_iter()
        .partition(|(name, _)| key_schema.contains(name))
}

/// Pulls the primary key out of an update, returning it and the remaining fields.
///
/// Fields holding the missing sentinel are dropped first, so a missing key
/// component counts as absent.
pub fn extract_primary_key(
    table: &str,
    key_schema: &KeySchema,
    fields: Fields,
) -> Result<(Item, Fields)> {
    let mut fields = fields.without_missing();
    let mut key = Item::new();

    for element in key_schema.elements() {
        match fields.remove(&element.name) {
            Some(FieldValue::Set(value)) => {
                key.insert(element.name.clone(), value);
            }
            _ => {
                return Err(CoreError::MissingPrimaryKey {
                    table: table.to_string(),
                    key_type: element.key_type.as_str(),
                    field: element.name.clone(),
                });
            }
        }
    }

    Ok((key, fields))
}

/// Extracts the primary key values from a stored row, for deletes.
pub fn key_of(table: &str, key_schema: &KeySchema, item: &Item) -> Result<Item> {
    key_schema
        .elements()
        .iter()
        .map(|element| {
            item.get(&element.name)
                .map(|v| (element.name.clone(), v.clone()))
                .ok_or_else(|| CoreError::MissingKeyField {
                    operation: "table.clear",
                    key_type: element.key_type.as_str(),
                    field: element.name.clone(),
                    table: table.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{MISSING_KEY, REMOVE_KEY};

    fn hash_range() -> KeySchema {
        KeySchema::hash_range("id", "ts")
    }

    #[test]
    fn test_resolve_get_key() {
        let key = resolve_get_key(
            "User",
            &hash_range(),
            Fields::new().with("ts", 1600000000).with("id", "1"),
        )
        .unwrap();

        assert_eq!(key.len(), 2);
        assert_eq!(key.get("id"), Some(&Value::from("1")));
    }

    #[test]
    fn test_resolve_get_key_missing_field_for_every_shape() {
        for schema in [KeySchema::hash("id"), hash_range()] {
            for omitted in schema.names().map(str::to_string).collect::<Vec<_>>() {
                let fields: Fields = schema
                    .names()
                    .filter(|n| *n != omitted)
                    .map(|n| (n.to_string(), Value::from("x")))
                    .collect();

                let err = resolve_get_key("User", &schema, fields).unwrap_err();
                assert!(
                    matches!(err, CoreError::MissingKeyField { ref field, .. } if *field == omitted),
                    "unexpected error {:?}",
                    err
                );
            }
        }
    }

    #[test]
    fn test_resolve_get_key_missing_sentinel_counts_as_absent() {
        let err = resolve_get_key(
            "User",
            &hash_range(),
            Fields::new().with("id", "1").with("ts", MISSING_KEY),
        )
        .unwrap_err();

        assert_eq!(
            err,
            CoreError::MissingKeyField {
                operation: "table.get",
                key_type: "RANGE",
                field: "ts".to_string(),
                table: "User".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_get_key_unexpected_field() {
        let err = resolve_get_key(
            "User",
            &hash_range(),
            Fields::new().with("id", "1").with("ts", 1).with("name", "Jack"),
        )
        .unwrap_err();

        assert_eq!(
            err,
            CoreError::UnexpectedField {
                operation: "table.get",
                fields: vec!["name".to_string()],
            }
        );
    }

    #[test]
    fn test_split_key_fields() {
        let (key, rest) = split_key_fields(
            &KeySchema::hash("age"),
            vec![
                ("hair".to_string(), Value::from("white")),
                ("age".to_string(), Value::from(823)),
            ],
        );

        assert_eq!(key, vec![("age".to_string(), Value::from(823))]);
        assert_eq!(rest, vec![("hair".to_string(), Value::from("white"))]);
    }

    #[test]
    fn test_extract_primary_key() {
        let (key, rest) = extract_primary_key(
            "User",
            &hash_range(),
            Fields::new()
                .with("id", "1")
                .with("email", "jf@northpole.net")
                .with("ts", 1600000000)
                .with("nickname", REMOVE_KEY),
        )
        .unwrap();

        assert_eq!(key.len(), 2);
        assert_eq!(rest.keys().collect::<Vec<_>>(), vec!["email", "nickname"]);
    }

    #[test]
    fn test_extract_primary_key_missing() {
        let err = extract_primary_key("User", &hash_range(), Fields::new().with("id", "1").with("age", 3))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingPrimaryKey { key_type: "RANGE", .. }));
    }

    #[test]
    fn test_key_of() {
        let item = Item::from([
            ("id".to_string(), Value::from("1")),
            ("ts".to_string(), Value::from(5)),
            ("hair".to_string(), Value::from("white")),
        ]);
        let key = key_of("User", &hash_range(), &item).unwrap();
        assert_eq!(key.len(), 2);
        assert!(!key.contains_key("hair"));
    }
}
