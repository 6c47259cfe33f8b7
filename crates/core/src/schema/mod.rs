//! Key schemas, index selection and table definitions.

mod definition;
mod description;
mod key;

pub use definition::{AttributeType, BillingMode, KeyDefinition, TableDefinition};
pub use description::{format_summary, TableDescription, TableStatus};
pub use key::{
    IndexKind, IndexSchema, IndexSelector, KeyElement, KeySchema, KeyType, TableSchema,
    PRIMARY_KEY,
};
