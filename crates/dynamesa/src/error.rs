use dynamesa_core::{CoreError, Item};
use thiserror::Error;

/// Errors returned by table and registry operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("{table} item not found: {}", format_key(.key))]
    NotFound { table: String, key: Item },
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),
    #[error("Throughput exceeded, please retry: {0}")]
    Throttled(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Service error: {0}")]
    Service(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Timed out waiting for table {table} to become {state}")]
    WaitTimeout { table: String, state: &'static str },
}

impl Error {
    /// True when the item or table does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::TableNotFound(_))
    }
}

// Sorted so the message is stable.
fn format_key(key: &Item) -> String {
    let mut parts: Vec<String> = key.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    parts.sort();
    parts.join(", ")
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use dynamesa_core::Value;

    #[test]
    fn test_not_found_display() {
        let error = Error::NotFound {
            table: "User".to_string(),
            key: Item::from([
                ("ts".to_string(), Value::from(1600000000)),
                ("id".to_string(), Value::from("1")),
            ]),
        };
        assert_eq!(error.to_string(), "User item not found: id=\"1\", ts=1600000000");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_core_error_is_transparent() {
        let error = Error::from(CoreError::EmptyUpdate);
        assert_eq!(
            error.to_string(),
            "There were no updates to apply, update contained only the primary key"
        );
    }

    #[test]
    fn test_wait_timeout_display() {
        let error = Error::WaitTimeout {
            table: "User".to_string(),
            state: "active",
        };
        assert_eq!(
            error.to_string(),
            "Timed out waiting for table User to become active"
        );
        assert!(!error.is_not_found());
    }
}
