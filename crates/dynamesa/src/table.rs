//! Table handles.

use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::OnceCell;

use dynamesa_core::find::plan_find;
use dynamesa_core::resolver::{key_of, resolve_get_key};
use dynamesa_core::{
    build_update, FindArgs, FindPlan, Fields, Item, Record, TableDescription, TableSchema,
};

use crate::backend::{Page, QueryRequest, ReturnValues, ScanRequest, TableBackend, UpdateRequest};
use crate::batch::BatchWriter;
use crate::error::{Error, Result};

/// A lazily paged sequence of records.
pub type RecordStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// State shared by every handle to one table.
pub(crate) struct TableInner {
    name: String,
    backend: Arc<dyn TableBackend>,
    description: OnceCell<TableDescription>,
}

impl TableInner {
    pub(crate) fn new(name: impl Into<String>, backend: Arc<dyn TableBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            description: OnceCell::new(),
        }
    }

    pub(crate) fn with_description(
        backend: Arc<dyn TableBackend>,
        description: TableDescription,
    ) -> Self {
        Self {
            name: description.table_name.clone(),
            backend,
            description: OnceCell::new_with(Some(description)),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Fetched once per handle and cached.
    pub(crate) async fn description(&self) -> Result<&TableDescription> {
        self.description
            .get_or_try_init(|| async {
                tracing::trace!(table = %self.name, "Describing table");
                self.backend
                    .describe_table(&self.name)
                    .await?
                    .ok_or_else(|| Error::TableNotFound(self.name.clone()))
            })
            .await
    }

    async fn fetch_page(&self, plan: &FindPlan, start: Option<Item>) -> Result<Page> {
        tracing::trace!(table = %self.name, query = plan.is_query(), "Fetching page");
        match plan {
            FindPlan::Query {
                index_name,
                key_condition,
                filter,
            } => {
                self.backend
                    .query(QueryRequest {
                        table_name: self.name.clone(),
                        index_name: index_name.clone(),
                        key_condition: key_condition.clone(),
                        filter: filter.clone(),
                        exclusive_start_key: start,
                    })
                    .await
            }
            FindPlan::Scan { filter } => {
                self.backend
                    .scan(ScanRequest {
                        table_name: self.name.clone(),
                        filter: filter.clone(),
                        exclusive_start_key: start,
                    })
                    .await
            }
        }
    }

    /// Streams the raw rows a find call selects, one page at a time.
    fn rows(self: Arc<Self>, args: FindArgs) -> RecordStream<Item> {
        let inner = self;
        let stream = async_stream::stream! {
            let plan = match inner.description().await {
                Ok(description) => {
                    plan_find(&inner.name, &description.schema, args).map_err(Error::from)
                }
                Err(err) => Err(err),
            };

            match plan {
                Err(err) => {
                    yield Err(err);
                }
                Ok(plan) => {
                    let mut start = None;
                    loop {
                        let page = match inner.fetch_page(&plan, start.take()).await {
                            Ok(page) => page,
                            Err(err) => {
                                yield Err(err);
                                break;
                            }
                        };

                        for item in page.items {
                            yield Ok(item);
                        }

                        match page.last_evaluated_key {
                            Some(key) => start = Some(key),
                            None => break,
                        }
                    }
                }
            }
        };

        Box::pin(stream)
    }
}

/// A handle to one table, reading rows as `T`.
///
/// Handles are cheap to clone; clones share the cached table description.
pub struct Table<T = Item> {
    inner: Arc<TableInner>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Table: {}>", self.inner.name)
    }
}

impl<T: Record> Table<T> {
    /// Creates a standalone handle, outside any registry.
    pub fn new(name: impl Into<String>, backend: Arc<dyn TableBackend>) -> Self {
        Self::from_inner(Arc::new(TableInner::new(name, backend)))
    }

    pub(crate) fn from_inner(inner: Arc<TableInner>) -> Self {
        Self {
            inner,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The table's description, fetched on first use.
    pub async fn description(&self) -> Result<&TableDescription> {
        self.inner.description().await
    }

    pub async fn schema(&self) -> Result<&TableSchema> {
        Ok(&self.inner.description().await?.schema)
    }

    /// The same table, reading rows as `U`.
    pub fn typed<U: Record>(&self) -> Table<U> {
        Table::from_inner(Arc::clone(&self.inner))
    }

    /// Fetches one row by its full primary key.
    ///
    /// Every key attribute must be supplied and nothing else.
    pub async fn get(&self, key: impl Into<Fields>) -> Result<T> {
        let description = self.inner.description().await?;
        let key = resolve_get_key(self.name(), &description.schema.primary, key.into())?;

        match self.inner.backend.get_item(self.name(), &key).await? {
            Some(item) => Ok(T::from_item(item)?),
            None => Err(Error::NotFound {
                table: self.name().to_string(),
                key,
            }),
        }
    }

    /// Stores a row, replacing any row with the same key.
    ///
    /// Fields holding a sentinel are not stored.
    pub async fn put<U: Record>(&self, record: &U) -> Result<()> {
        let item = record.to_fields()?.into_item();
        self.inner.backend.put_item(self.name(), item).await?;
        tracing::debug!(table = %self.name(), "Put item");
        Ok(())
    }

    /// Applies an update and returns the row as it is afterwards.
    ///
    /// The update must carry the full primary key plus at least one other
    /// field. Fields set to [`REMOVE_KEY`](dynamesa_core::REMOVE_KEY) are
    /// removed from the row and also from `update` itself, before the request
    /// is sent.
    pub async fn update<U: Record>(&self, update: &mut U) -> Result<T> {
        match self.update_with(update, ReturnValues::AllNew).await? {
            Some(item) => Ok(T::from_item(item)?),
            None => Err(Error::InvalidData(format!(
                "Update on {} returned no attributes",
                self.name()
            ))),
        }
    }

    /// Like [`update`](Table::update) with a chosen return mode.
    pub async fn update_with<U: Record>(
        &self,
        update: &mut U,
        return_values: ReturnValues,
    ) -> Result<Option<Item>> {
        let description = self.inner.description().await?;
        let plan = build_update(self.name(), &description.schema.primary, update.to_fields()?)?;

        for field in plan.removed_fields() {
            update.mark_removed(field);
        }

        tracing::debug!(table = %self.name(), expression = %plan.expression, "Updating item");

        self.inner
            .backend
            .update_item(UpdateRequest {
                table_name: self.name().to_string(),
                plan,
                return_values,
            })
            .await
    }

    /// Streams every row the arguments select.
    ///
    /// With an index selector this is a query against that index, otherwise
    /// a full scan. Pages are fetched as the stream is polled; dropping it
    /// stops fetching. Argument errors surface as the first item.
    pub fn find(&self, args: FindArgs) -> RecordStream<T> {
        let rows = Arc::clone(&self.inner).rows(args);
        Box::pin(rows.map(|row| row.and_then(|item| T::from_item(item).map_err(Error::from))))
    }

    /// Deletes every row the arguments select. Returns how many were deleted.
    ///
    /// Clearing with no arguments empties the table.
    pub async fn clear(&self, args: FindArgs) -> Result<usize> {
        let description = self.inner.description().await?;
        let mut rows = Arc::clone(&self.inner).rows(args);
        let mut writer = BatchWriter::new(self.inner.backend.as_ref(), self.name());

        while let Some(row) = rows.next().await {
            let key = key_of(self.name(), &description.schema.primary, &row?)?;
            writer.delete(key).await?;
        }

        let deleted = writer.flush().await?;
        tracing::debug!(table = %self.name(), deleted, "Cleared items");
        Ok(deleted)
    }

    /// One-line summary, e.g. `User (2024-01-15, 3 items)`.
    ///
    /// Fetches a fresh description so the item count is current.
    pub async fn summary(&self) -> Result<String> {
        let description = self
            .inner
            .backend
            .describe_table(self.name())
            .await?
            .ok_or_else(|| Error::TableNotFound(self.name().to_string()))?;
        Ok(description.to_string())
    }
}
