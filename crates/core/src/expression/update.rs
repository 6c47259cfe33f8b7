use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::resolver::extract_primary_key;
use crate::schema::KeySchema;
use crate::value::{FieldValue, Fields, Item, Value};

/// One modification an update applies to the stored row.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    Set { name: String, value: Value },
    Remove { name: String },
}

/// A ready-to-send update: the addressed key, the expression text with its
/// placeholder maps, and the same modifications as structured actions.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub key: Item,
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, Value>,
    pub actions: Vec<UpdateAction>,
}

impl UpdatePlan {
    /// Fields this update removes, in the order they were supplied.
    pub fn removed_fields(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().filter_map(|action| match action {
            UpdateAction::Remove { name } => Some(name.as_str()),
            UpdateAction::Set { .. } => None,
        })
    }

    /// Applies the actions to a stored row.
    pub fn apply(&self, item: &mut Item) {
        for action in &self.actions {
            match action {
                UpdateAction::Set { name, value } => {
                    item.insert(name.clone(), value.clone());
                }
                UpdateAction::Remove { name } => {
                    item.remove(name);
                }
            }
        }
    }
}

/// Builds the update expression for `fields` against a table's primary key.
///
/// Field `i` (after the key is stripped) gets `#a{i}` and, when it is set,
/// `:v{i}`. Fields holding the missing sentinel are left untouched.
pub fn build_update(table: &str, key_schema: &KeySchema, fields: Fields) -> Result<UpdatePlan> {
    let (key, rest) = extract_primary_key(table, key_schema, fields)?;
    if rest.is_empty() {
        return Err(CoreError::EmptyUpdate);
    }

    let mut set_clauses = Vec::new();
    let mut remove_clauses = Vec::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut actions = Vec::new();

    for (i, (name, value)) in rest.into_iter().enumerate() {
        let name_placeholder = format!("#a{}", i);
        match value {
            FieldValue::Missing => continue,
            FieldValue::Remove => {
                remove_clauses.push(name_placeholder.clone());
                actions.push(UpdateAction::Remove { name: name.clone() });
            }
            FieldValue::Set(value) => {
                let value_placeholder = format!(":v{}", i);
                set_clauses.push(format!("{} = {}", name_placeholder, value_placeholder));
                values.insert(value_placeholder, value.clone());
                actions.push(UpdateAction::Set {
                    name: name.clone(),
                    value,
                });
            }
        }
        names.insert(name_placeholder, name);
    }

    let mut segments = Vec::new();
    if !set_clauses.is_empty() {
        segments.push(format!("SET {}", set_clauses.join(", ")));
    }
    if !remove_clauses.is_empty() {
        segments.push(format!("REMOVE {}", remove_clauses.join(", ")));
    }

    Ok(UpdatePlan {
        key,
        expression: segments.join(" "),
        names,
        values,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{MISSING_KEY, REMOVE_KEY};

    fn schema() -> KeySchema {
        KeySchema::hash_range("id", "ts")
    }

    #[test]
    fn test_build_update_set_and_remove() {
        let plan = build_update(
            "User",
            &schema(),
            Fields::new()
                .with("id", "1")
                .with("ts", 1600000000)
                .with("email", "jf@northpole.net")
                .with("nickname", REMOVE_KEY)
                .with("age", 823),
        )
        .unwrap();

        assert_eq!(plan.expression, "SET #a0 = :v0, #a2 = :v2 REMOVE #a1");
        assert_eq!(plan.names.get("#a1").map(String::as_str), Some("nickname"));
        assert_eq!(plan.values.get(":v2"), Some(&Value::from(823)));
        assert!(!plan.values.contains_key(":v1"));
        assert_eq!(plan.key.len(), 2);
        assert_eq!(plan.removed_fields().collect::<Vec<_>>(), vec!["nickname"]);
    }

    #[test]
    fn test_build_update_remove_only() {
        let plan = build_update(
            "User",
            &schema(),
            Fields::new()
                .with("id", "1")
                .with("ts", 1)
                .with("nickname", REMOVE_KEY),
        )
        .unwrap();

        assert_eq!(plan.expression, "REMOVE #a0");
        assert!(plan.values.is_empty());
    }

    #[test]
    fn test_build_update_skips_missing() {
        let plan = build_update(
            "User",
            &schema(),
            Fields::new()
                .with("id", "1")
                .with("ts", 1)
                .with("nickname", MISSING_KEY)
                .with("hair", "white"),
        )
        .unwrap();

        assert_eq!(plan.expression, "SET #a0 = :v0");
        assert_eq!(plan.names.len(), 1);
        assert_eq!(plan.actions.len(), 1);
    }

    #[test]
    fn test_build_update_only_key_is_empty() {
        let err = build_update(
            "User",
            &schema(),
            Fields::new().with("id", "1").with("ts", 1).with("age", MISSING_KEY),
        )
        .unwrap_err();
        assert_eq!(err, CoreError::EmptyUpdate);
    }

    #[test]
    fn test_build_update_missing_primary_key() {
        let err = build_update("User", &schema(), Fields::new().with("id", "1").with("age", 3))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_apply_removes_only_targeted_fields() {
        let mut item = Item::from([
            ("id".to_string(), Value::from("1")),
            ("ts".to_string(), Value::from(1)),
            ("a".to_string(), Value::from("a")),
            ("b".to_string(), Value::from("b")),
            ("c".to_string(), Value::from("c")),
        ]);
        let plan = build_update(
            "User",
            &schema(),
            Fields::new().with("id", "1").with("ts", 1).with("b", REMOVE_KEY),
        )
        .unwrap();

        plan.apply(&mut item);

        let mut keys: Vec<_> = item.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "c", "id", "ts"]);
    }
}
