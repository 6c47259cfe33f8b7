//! Pure core of the dynamesa DynamoDB layer.
//!
//! Everything in this crate is synchronous and free of I/O: it classifies
//! fields against key schemas, builds placeholder-based update and condition
//! expressions, and plans whether a `find` call becomes a query or a scan.
//! The `dynamesa` crate sends the results to the database.

pub mod error;
pub mod expression;
pub mod find;
pub mod record;
pub mod resolver;
pub mod schema;
pub mod value;

pub use error::{CoreError, Result};
pub use expression::{
    attr, build_update, key, Comparator, Condition, Path, Placeholders, RenderedCondition,
    UpdateAction, UpdatePlan,
};
pub use find::{plan_find, FindArgs, FindPlan};
pub use record::Record;
pub use schema::{
    AttributeType, BillingMode, IndexKind, IndexSchema, IndexSelector, KeyDefinition, KeyElement,
    KeySchema, KeyType, TableDefinition, TableDescription, TableSchema, TableStatus, PRIMARY_KEY,
};
pub use value::{Field, FieldValue, Fields, Item, Value, MISSING_KEY, REMOVE_KEY};
