//! Storage backends.
//!
//! [`TableBackend`] is the seam between the table layer and the service:
//! every method is a single request. Paging, batching and waiting are
//! driven by the caller.

use async_trait::async_trait;
use dynamesa_core::{Condition, Item, TableDefinition, TableDescription, UpdatePlan};

use crate::error::Result;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;
#[cfg(feature = "inmemory")]
pub mod inmemory;

/// Maximum number of requests in one batch write.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// What an update returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnValues {
    None,
    AllOld,
    UpdatedOld,
    #[default]
    AllNew,
    UpdatedNew,
}

impl ReturnValues {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnValues::None => "NONE",
            ReturnValues::AllOld => "ALL_OLD",
            ReturnValues::UpdatedOld => "UPDATED_OLD",
            ReturnValues::AllNew => "ALL_NEW",
            ReturnValues::UpdatedNew => "UPDATED_NEW",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub table_name: String,
    pub plan: UpdatePlan,
    pub return_values: ReturnValues,
}

/// One page of a query against a table or one of its indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table_name: String,
    /// `None` queries the primary index.
    pub index_name: Option<String>,
    pub key_condition: Condition,
    pub filter: Option<Condition>,
    pub exclusive_start_key: Option<Item>,
}

/// One page of a full table scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub table_name: String,
    pub filter: Option<Condition>,
    pub exclusive_start_key: Option<Item>,
}

/// Items of one page plus where the next page starts.
///
/// A page may be empty while more pages remain when a filter discarded
/// everything the page read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Item>,
}

/// Storage operations the table layer is built on.
#[async_trait]
pub trait TableBackend: Send + Sync {
    async fn get_item(&self, table_name: &str, key: &Item) -> Result<Option<Item>>;

    /// Stores the item, replacing any row with the same primary key.
    async fn put_item(&self, table_name: &str, item: Item) -> Result<()>;

    /// Applies an update, creating the row if it does not exist.
    async fn update_item(&self, request: UpdateRequest) -> Result<Option<Item>>;

    async fn query(&self, request: QueryRequest) -> Result<Page>;

    async fn scan(&self, request: ScanRequest) -> Result<Page>;

    /// Deletes up to [`BATCH_WRITE_LIMIT`] rows by key.
    ///
    /// Returns the keys the service did not process.
    async fn batch_delete(&self, table_name: &str, keys: Vec<Item>) -> Result<Vec<Item>>;

    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Returns `None` if the table does not exist.
    async fn describe_table(&self, table_name: &str) -> Result<Option<TableDescription>>;

    async fn create_table(&self, definition: &TableDefinition) -> Result<()>;

    async fn delete_table(&self, table_name: &str) -> Result<()>;
}
