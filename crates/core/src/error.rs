use thiserror::Error;

/// Errors raised while resolving keys, building expressions or planning a find.
///
/// All of these are caller mistakes: none of them is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{operation} was missing {key_type} key, {field} for table {table}")]
    MissingKeyField {
        operation: &'static str,
        key_type: &'static str,
        field: String,
        table: String,
    },
    #[error("{operation} received unexpected fields: {fields:?}")]
    UnexpectedField {
        operation: &'static str,
        fields: Vec<String>,
    },
    #[error("Couldn't update {table} because the update is missing the {key_type} key, {field:?}")]
    MissingPrimaryKey {
        table: String,
        key_type: &'static str,
        field: String,
    },
    #[error("There were no updates to apply, update contained only the primary key")]
    EmptyUpdate,
    #[error("Usage error: {0}")]
    UsageError(String),
    #[error("Index {index} does not exist on table {table}")]
    UnknownIndex { table: String, index: String },
    #[error("Invalid key schema: {0}")]
    InvalidKeySchema(String),
    #[error("Attribute {attribute} declared as both {first} and {second}")]
    ConflictingAttributeType {
        attribute: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_field_display() {
        let error = CoreError::MissingKeyField {
            operation: "table.get",
            key_type: "RANGE",
            field: "ts".to_string(),
            table: "User".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "table.get was missing RANGE key, ts for table User"
        );
    }

    #[test]
    fn test_missing_primary_key_display() {
        let error = CoreError::MissingPrimaryKey {
            table: "User".to_string(),
            key_type: "HASH",
            field: "id".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Couldn't update User because the update is missing the HASH key, \"id\""
        );
    }

    #[test]
    fn test_empty_update_display() {
        assert_eq!(
            CoreError::EmptyUpdate.to_string(),
            "There were no updates to apply, update contained only the primary key"
        );
    }

    #[test]
    fn test_unknown_index_display() {
        let error = CoreError::UnknownIndex {
            table: "User".to_string(),
            index: "NameIndex".to_string(),
        };
        assert_eq!(error.to_string(), "Index NameIndex does not exist on table User");
    }
}
