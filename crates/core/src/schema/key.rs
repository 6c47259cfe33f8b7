use std::fmt;

use crate::error::{CoreError, Result};

/// Selects the table's base index in a `find` call.
pub const PRIMARY_KEY: IndexSelector = IndexSelector::Primary;

/// Role of a key element within its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Hash,
    Range,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Hash => "HASH",
            KeyType::Range => "RANGE",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute of a key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyElement {
    pub name: String,
    pub key_type: KeyType,
}

/// The key of an index: a hash key and an optional range key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    elements: Vec<KeyElement>,
}

impl KeySchema {
    /// Hash-only key.
    pub fn hash(name: impl Into<String>) -> Self {
        Self {
            elements: vec![KeyElement {
                name: name.into(),
                key_type: KeyType::Hash,
            }],
        }
    }

    /// Hash and range key.
    pub fn hash_range(hash: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            elements: vec![
                KeyElement {
                    name: hash.into(),
                    key_type: KeyType::Hash,
                },
                KeyElement {
                    name: range.into(),
                    key_type: KeyType::Range,
                },
            ],
        }
    }

    /// Builds a key schema from elements as reported by the database.
    ///
    /// Elements are reordered hash first; there must be exactly one hash key,
    /// at most one range key, and the names must differ.
    pub fn from_elements(elements: Vec<KeyElement>) -> Result<Self> {
        let hash: Vec<&KeyElement> = elements
            .iter()
            .filter(|e| e.key_type == KeyType::Hash)
            .collect();
        let range: Vec<&KeyElement> = elements
            .iter()
            .filter(|e| e.key_type == KeyType::Range)
            .collect();

        match (hash.as_slice(), range.as_slice()) {
            ([h], []) => Ok(Self::hash(h.name.clone())),
            ([h], [r]) if h.name != r.name => Ok(Self::hash_range(h.name.clone(), r.name.clone())),
            ([h], [_]) => Err(CoreError::InvalidKeySchema(format!(
                "hash and range key share the name {}",
                h.name
            ))),
            _ => Err(CoreError::InvalidKeySchema(format!(
                "expected one HASH and at most one RANGE key, got {} and {}",
                hash.len(),
                range.len()
            ))),
        }
    }

    pub fn elements(&self) -> &[KeyElement] {
        &self.elements
    }

    pub fn hash_key(&self) -> &str {
        &self.elements[0].name
    }

    pub fn range_key(&self) -> Option<&str> {
        self.elements.get(1).map(|e| e.name.as_str())
    }

    /// Key attribute names, hash first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.elements.iter().any(|e| e.name == name)
    }
}

/// Global or local secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Global,
    Local,
}

/// A named secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub kind: IndexKind,
    pub key_schema: KeySchema,
}

/// Which index a `find` call runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexSelector {
    /// The table's base index.
    Primary,
    /// A secondary index by name.
    Named(String),
}

impl IndexSelector {
    /// Index name to send with a query; `None` for the base index.
    pub fn index_name(&self) -> Option<&str> {
        match self {
            IndexSelector::Primary => None,
            IndexSelector::Named(name) => Some(name),
        }
    }
}

impl From<&str> for IndexSelector {
    fn from(name: &str) -> Self {
        IndexSelector::Named(name.to_string())
    }
}

impl From<String> for IndexSelector {
    fn from(name: String) -> Self {
        IndexSelector::Named(name)
    }
}

/// Primary key plus secondary indexes of a table. Immutable once the table exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub primary: KeySchema,
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    pub fn new(primary: KeySchema) -> Self {
        Self {
            primary,
            indexes: Vec::new(),
        }
    }

    pub fn with_index(mut self, name: impl Into<String>, kind: IndexKind, key_schema: KeySchema) -> Self {
        self.indexes.push(IndexSchema {
            name: name.into(),
            kind,
            key_schema,
        });
        self
    }

    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|idx| idx.name == name)
    }

    /// Key schema for a selector. Both global and local indexes are searched.
    pub fn key_schema_for(&self, table: &str, selector: &IndexSelector) -> Result<&KeySchema> {
        match selector {
            IndexSelector::Primary => Ok(&self.primary),
            IndexSelector::Named(name) => self
                .index(name)
                .map(|idx| &idx.key_schema)
                .ok_or_else(|| CoreError::UnknownIndex {
                    table: table.to_string(),
                    index: name.clone(),
                }),
        }
    }
}
