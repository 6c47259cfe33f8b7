//! Table creation input (pure data).

use std::fmt;
use std::str::FromStr;

use super::key::{IndexKind, KeySchema, TableSchema};
use crate::error::{CoreError, Result};

/// Scalar types a key attribute may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    String,
    Number,
    Binary,
}

impl AttributeType {
    /// Type code used by the database (`S`, `N`, `B`).
    pub fn code(&self) -> &'static str {
        match self {
            AttributeType::String => "S",
            AttributeType::Number => "N",
            AttributeType::Binary => "B",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AttributeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "S" => Ok(AttributeType::String),
            "N" => Ok(AttributeType::Number),
            "B" => Ok(AttributeType::Binary),
            other => Err(CoreError::InvalidKeySchema(format!(
                "Unknown attribute type: {}",
                other
            ))),
        }
    }
}

/// A hash key with an optional range key, each with its attribute type.
///
/// Converts from `(name, type)` and `(name, type, name, type)` tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub hash: (String, AttributeType),
    pub range: Option<(String, AttributeType)>,
}

impl KeyDefinition {
    pub fn hash(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            hash: (name.into(), attribute_type),
            range: None,
        }
    }

    pub fn with_range(mut self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.range = Some((name.into(), attribute_type));
        self
    }

    pub fn key_schema(&self) -> KeySchema {
        match &self.range {
            Some((range, _)) => KeySchema::hash_range(self.hash.0.clone(), range.clone()),
            None => KeySchema::hash(self.hash.0.clone()),
        }
    }

    fn attributes(&self) -> impl Iterator<Item = &(String, AttributeType)> {
        std::iter::once(&self.hash).chain(self.range.iter())
    }
}

impl<S: Into<String>> From<(S, AttributeType)> for KeyDefinition {
    fn from((name, attribute_type): (S, AttributeType)) -> Self {
        KeyDefinition::hash(name, attribute_type)
    }
}

impl<S: Into<String>, R: Into<String>> From<(S, AttributeType, R, AttributeType)> for KeyDefinition {
    fn from((hash, hash_type, range, range_type): (S, AttributeType, R, AttributeType)) -> Self {
        KeyDefinition::hash(hash, hash_type).with_range(range, range_type)
    }
}

/// Capacity mode for a new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    /// Provisioned throughput, applied to the table and each global index.
    Provisioned { read: i64, write: i64 },
    PayPerRequest,
}

impl Default for BillingMode {
    fn default() -> Self {
        BillingMode::Provisioned {
            read: 10,
            write: 10,
        }
    }
}

/// Everything needed to create a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub table_name: String,
    pub primary: KeyDefinition,
    pub global_indexes: Vec<(String, KeyDefinition)>,
    pub local_indexes: Vec<(String, KeyDefinition)>,
    pub billing_mode: BillingMode,
}

impl TableDefinition {
    pub fn new(table_name: impl Into<String>, primary: impl Into<KeyDefinition>) -> Self {
        Self {
            table_name: table_name.into(),
            primary: primary.into(),
            global_indexes: Vec::new(),
            local_indexes: Vec::new(),
            billing_mode: BillingMode::default(),
        }
    }

    pub fn with_global_index(mut self, name: impl Into<String>, key: impl Into<KeyDefinition>) -> Self {
        self.global_indexes.push((name.into(), key.into()));
        self
    }

    pub fn with_local_index(mut self, name: impl Into<String>, key: impl Into<KeyDefinition>) -> Self {
        self.local_indexes.push((name.into(), key.into()));
        self
    }

    pub fn with_billing_mode(mut self, billing_mode: BillingMode) -> Self {
        self.billing_mode = billing_mode;
        self
    }

    /// Sets the table name.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table_name = name.to_string();
        self
    }

    /// Key attributes of the table and every index, each declared once.
    ///
    /// Fails when one attribute is declared with two different types.
    pub fn attribute_definitions(&self) -> Result<Vec<(String, AttributeType)>> {
        let mut definitions: Vec<(String, AttributeType)> = Vec::new();
        let all_keys = std::iter::once(&self.primary)
            .chain(self.global_indexes.iter().map(|(_, k)| k))
            .chain(self.local_indexes.iter().map(|(_, k)| k));

        for (name, attribute_type) in all_keys.flat_map(KeyDefinition::attributes) {
            match definitions.iter().find(|(n, _)| n == name) {
                Some((_, existing)) if existing != attribute_type => {
                    return Err(CoreError::ConflictingAttributeType {
                        attribute: name.clone(),
                        first: existing.code(),
                        second: attribute_type.code(),
                    });
                }
                Some(_) => {}
                None => definitions.push((name.clone(), *attribute_type)),
            }
        }

        Ok(definitions)
    }

    /// Checks the definition before it is sent.
    ///
    /// Local indexes must share the table's hash key and the table must have a
    /// range key for them to exist.
    pub fn validate(&self) -> Result<()> {
        self.attribute_definitions()?;

        if !self.local_indexes.is_empty() && self.primary.range.is_none() {
            return Err(CoreError::InvalidKeySchema(format!(
                "table {} needs a range key to have local indexes",
                self.table_name
            )));
        }

        for (name, key) in &self.local_indexes {
            if key.hash.0 != self.primary.hash.0 {
                return Err(CoreError::InvalidKeySchema(format!(
                    "local index {} must use the table hash key {}",
                    name, self.primary.hash.0
                )));
            }
        }

        Ok(())
    }

    /// The schema the table will have once created.
    pub fn schema(&self) -> TableSchema {
        let schema = TableSchema::new(self.primary.key_schema());
        let schema = self
            .global_indexes
            .iter()
            .fold(schema, |s, (name, key)| {
                s.with_index(name.clone(), IndexKind::Global, key.key_schema())
            });
        self.local_indexes.iter().fold(schema, |s, (name, key)| {
            s.with_index(name.clone(), IndexKind::Local, key.key_schema())
        })
    }
}
