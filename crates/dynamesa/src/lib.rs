//! dynamesa - a small convenience layer over DynamoDB tables.
//!
//! [`Tables`] resolves table names to [`Table`] handles; handles read and
//! write rows, run queries or scans as lazy streams, and clear rows in
//! batches. The pure planning lives in `dynamesa_core` and is re-exported
//! here.

pub mod backend;
mod batch;
pub mod config;
pub mod error;
mod registry;
mod table;

pub use backend::{Page, QueryRequest, ReturnValues, ScanRequest, TableBackend, UpdateRequest};
#[cfg(feature = "dynamodb")]
pub use backend::dynamodb::DynamoDbBackend;
#[cfg(feature = "inmemory")]
pub use backend::inmemory::InMemoryBackend;
pub use config::{Config, StaticCredentials, WaitConfig};
pub use error::{Error, Result};
pub use registry::Tables;
pub use table::{RecordStream, Table};

pub use dynamesa_core::record;
pub use dynamesa_core::{
    attr, key, AttributeType, BillingMode, Condition, CoreError, Field, FieldValue, Fields,
    FindArgs, IndexSelector, Item, KeyDefinition, KeySchema, Record, TableDefinition,
    TableDescription, TableSchema, Value, MISSING_KEY, PRIMARY_KEY, REMOVE_KEY,
};
