use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use dynamesa_core::resolver::key_of;
use dynamesa_core::{
    Condition, IndexSelector, Item, KeySchema, TableDefinition, TableDescription, TableSchema,
    TableStatus, UpdateAction, Value,
};

use crate::backend::{
    Page, QueryRequest, ReturnValues, ScanRequest, TableBackend, UpdateRequest, BATCH_WRITE_LIMIT,
};
use crate::error::{Error, Result};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct StoredTable {
    schema: TableSchema,
    created_at: DateTime<Utc>,
    rows: Vec<Item>,
}

impl StoredTable {
    fn primary_key(&self, table_name: &str, item: &Item) -> Result<Item> {
        key_of(table_name, &self.schema.primary, item).map_err(|_| {
            Error::Service("One of the required keys was not given a value".to_string())
        })
    }

    fn position(&self, key: &Item) -> Option<usize> {
        self.rows.iter().position(|row| {
            self.schema
                .primary
                .names()
                .all(|name| match (row.get(name), key.get(name)) {
                    (Some(a), Some(b)) => a.matches(b),
                    _ => false,
                })
        })
    }

    fn describe(&self, table_name: &str) -> TableDescription {
        TableDescription {
            table_name: table_name.to_string(),
            schema: self.schema.clone(),
            status: TableStatus::Active,
            indexes_active: true,
            created_at: Some(self.created_at),
            item_count: self.rows.len() as i64,
        }
    }
}

/// In-memory storage backend for testing.
///
/// Data is not persisted and will be lost when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<HashMap<String, StoredTable>>>,
    page_size: usize,
    batch_capacity: usize,
    pages_served: Arc<AtomicUsize>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Creates a new backend with no tables.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            page_size: DEFAULT_PAGE_SIZE,
            batch_capacity: BATCH_WRITE_LIMIT,
            pages_served: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets how many rows a query or scan page reads.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Limits how many keys each batch delete processes; the rest come back
    /// unprocessed, as they do when the service is throttling.
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity.max(1);
        self
    }

    /// Number of query and scan pages served so far.
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(AtomicOrdering::SeqCst)
    }

    fn page(
        &self,
        mut candidates: Vec<Item>,
        order: &[String],
        filter: Option<&Condition>,
        exclusive_start_key: Option<&Item>,
    ) -> Page {
        self.pages_served.fetch_add(1, AtomicOrdering::SeqCst);

        candidates.sort_by(|a, b| compare_rows(order, a, b));
        if let Some(start) = exclusive_start_key {
            candidates.retain(|row| compare_rows(order, row, start) == Ordering::Greater);
        }

        let more = candidates.len() > self.page_size;
        candidates.truncate(self.page_size);

        let last_evaluated_key = if more {
            candidates.last().map(|row| project(row, order))
        } else {
            None
        };

        let items = candidates
            .into_iter()
            .filter(|row| filter.is_none_or(|f| f.evaluate(row)))
            .collect();

        Page {
            items,
            last_evaluated_key,
        }
    }
}

fn table_not_found(table_name: &str) -> Error {
    Error::TableNotFound(table_name.to_string())
}

/// Rows are ordered by the index key, then the primary key.
fn order_keys(index: &KeySchema, primary: &KeySchema) -> Vec<String> {
    let mut order: Vec<String> = index.names().map(str::to_string).collect();
    for name in primary.names() {
        if !order.iter().any(|n| n == name) {
            order.push(name.to_string());
        }
    }
    order
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a
            .compare(b)
            .unwrap_or_else(|| a.type_code().cmp(b.type_code())),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_rows(order: &[String], a: &Item, b: &Item) -> Ordering {
    order
        .iter()
        .map(|name| compare_values(a.get(name), b.get(name)))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn project(item: &Item, names: &[String]) -> Item {
    names
        .iter()
        .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

fn updated_names(actions: &[UpdateAction]) -> Vec<&str> {
    actions
        .iter()
        .map(|action| match action {
            UpdateAction::Set { name, .. } | UpdateAction::Remove { name } => name.as_str(),
        })
        .collect()
}

fn non_empty(item: Item) -> Option<Item> {
    if item.is_empty() {
        None
    } else {
        Some(item)
    }
}

#[async_trait]
impl TableBackend for InMemoryBackend {
    async fn get_item(&self, table_name: &str, key: &Item) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(table_name)
            .ok_or_else(|| table_not_found(table_name))?;

        if key.len() != table.schema.primary.elements().len() {
            return Err(Error::Service(
                "The provided key element does not match the schema".to_string(),
            ));
        }

        Ok(table.position(key).map(|i| table.rows[i].clone()))
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| table_not_found(table_name))?;

        let key = table.primary_key(table_name, &item)?;
        match table.position(&key) {
            Some(i) => table.rows[i] = item,
            None => table.rows.push(item),
        }
        Ok(())
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<Option<Item>> {
        let UpdateRequest {
            table_name,
            plan,
            return_values,
        } = request;

        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&table_name)
            .ok_or_else(|| table_not_found(&table_name))?;

        let key = table.primary_key(&table_name, &plan.key)?;
        let position = table.position(&key);
        let old = position.map(|i| table.rows[i].clone());

        let mut new = old.clone().unwrap_or_else(|| key.clone());
        plan.apply(&mut new);

        match position {
            Some(i) => table.rows[i] = new.clone(),
            None => table.rows.push(new.clone()),
        }

        let touched = updated_names(&plan.actions);
        let only_touched = |item: &Item| -> Item {
            item.iter()
                .filter(|(name, _)| touched.contains(&name.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        Ok(match return_values {
            ReturnValues::None => None,
            ReturnValues::AllOld => old,
            ReturnValues::UpdatedOld => old.as_ref().map(only_touched).and_then(non_empty),
            ReturnValues::AllNew => Some(new),
            ReturnValues::UpdatedNew => non_empty(only_touched(&new)),
        })
    }

    async fn query(&self, request: QueryRequest) -> Result<Page> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| table_not_found(&request.table_name))?;

        let selector = match &request.index_name {
            Some(name) => IndexSelector::Named(name.clone()),
            None => IndexSelector::Primary,
        };
        let index_keys = table
            .schema
            .key_schema_for(&request.table_name, &selector)
            .map_err(|_| {
                Error::Service("The table does not have the specified index".to_string())
            })?;
        let order = order_keys(index_keys, &table.schema.primary);

        // Secondary indexes only hold rows that carry their key attributes.
        let candidates = table
            .rows
            .iter()
            .filter(|row| index_keys.names().all(|name| row.contains_key(name)))
            .filter(|row| request.key_condition.evaluate(row))
            .cloned()
            .collect();

        Ok(self.page(
            candidates,
            &order,
            request.filter.as_ref(),
            request.exclusive_start_key.as_ref(),
        ))
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page> {
        let tables = self.tables.read().await;
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| table_not_found(&request.table_name))?;

        let order = order_keys(&table.schema.primary, &table.schema.primary);
        Ok(self.page(
            table.rows.clone(),
            &order,
            request.filter.as_ref(),
            request.exclusive_start_key.as_ref(),
        ))
    }

    async fn batch_delete(&self, table_name: &str, keys: Vec<Item>) -> Result<Vec<Item>> {
        if keys.len() > BATCH_WRITE_LIMIT {
            return Err(Error::Service(format!(
                "Too many items requested for the BatchWriteItem call: {}",
                keys.len()
            )));
        }

        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| table_not_found(table_name))?;

        let mut keys = keys;
        let unprocessed = if keys.len() > self.batch_capacity {
            keys.split_off(self.batch_capacity)
        } else {
            Vec::new()
        };

        for key in &keys {
            if let Some(i) = table.position(key) {
                table.rows.remove(i);
            }
        }

        Ok(unprocessed)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn describe_table(&self, table_name: &str) -> Result<Option<TableDescription>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table_name).map(|t| t.describe(table_name)))
    }

    async fn create_table(&self, definition: &TableDefinition) -> Result<()> {
        definition.validate()?;

        let mut tables = self.tables.write().await;
        if tables.contains_key(&definition.table_name) {
            return Err(Error::TableAlreadyExists(definition.table_name.clone()));
        }

        tables.insert(
            definition.table_name.clone(),
            StoredTable {
                schema: definition.schema(),
                created_at: Utc::now(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_table(&self, table_name: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .remove(table_name)
            .map(|_| ())
            .ok_or_else(|| table_not_found(table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamesa_core::{attr, build_update, key, AttributeType, Fields, REMOVE_KEY};

    fn user_definition() -> TableDefinition {
        TableDefinition::new(
            "User",
            ("id", AttributeType::String, "ts", AttributeType::Number),
        )
        .with_global_index("AgeIndex", ("age", AttributeType::Number))
    }

    fn user(id: &str, ts: i64, hair: &str) -> Item {
        Item::from([
            ("id".to_string(), Value::from(id)),
            ("ts".to_string(), Value::from(ts)),
            ("hair".to_string(), Value::from(hair)),
        ])
    }

    async fn seeded(page_size: usize) -> InMemoryBackend {
        let backend = InMemoryBackend::new().with_page_size(page_size);
        backend.create_table(&user_definition()).await.unwrap();
        for (id, ts, hair) in [("1", 1600000000, "white"), ("2", 1700000000, "none"), ("3", 1500000000, "white")] {
            backend.put_item("User", user(id, ts, hair)).await.unwrap();
        }
        backend
    }

    fn scan_request(filter: Option<Condition>, start: Option<Item>) -> ScanRequest {
        ScanRequest {
            table_name: "User".to_string(),
            filter,
            exclusive_start_key: start,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = seeded(100).await;
        let key = Item::from([
            ("id".to_string(), Value::from("1")),
            ("ts".to_string(), Value::from(1600000000)),
        ]);

        let item = backend.get_item("User", &key).await.unwrap().unwrap();
        assert_eq!(item.get("hair"), Some(&Value::from("white")));
    }

    #[tokio::test]
    async fn test_put_replaces_same_key() {
        let backend = seeded(100).await;
        backend
            .put_item("User", user("1", 1600000000, "none"))
            .await
            .unwrap();

        let description = backend.describe_table("User").await.unwrap().unwrap();
        assert_eq!(description.item_count, 3);
    }

    #[tokio::test]
    async fn test_put_without_key_fails() {
        let backend = seeded(100).await;
        let result = backend
            .put_item("User", Item::from([("id".to_string(), Value::from("9"))]))
            .await;
        assert!(matches!(result, Err(Error::Service(_))));
    }

    #[tokio::test]
    async fn test_missing_table() {
        let backend = InMemoryBackend::new();
        let result = backend.scan(ScanRequest {
            table_name: "Nope".to_string(),
            filter: None,
            exclusive_start_key: None,
        });
        assert_eq!(result.await, Err(Error::TableNotFound("Nope".to_string())));
    }

    #[tokio::test]
    async fn test_scan_pages_in_key_order() {
        let backend = seeded(2).await;

        let first = backend.scan(scan_request(None, None)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].get("id"), Some(&Value::from("1")));
        let start = first.last_evaluated_key.clone().unwrap();
        assert_eq!(start.len(), 2);

        let second = backend.scan(scan_request(None, Some(start))).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.last_evaluated_key, None);
        assert_eq!(backend.pages_served(), 2);
    }

    #[tokio::test]
    async fn test_filter_applies_after_paging() {
        let backend = seeded(1).await;
        let page = backend
            .scan(scan_request(Some(attr("hair").eq("white")), None))
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.last_evaluated_key.is_some());

        let page = backend
            .scan(scan_request(Some(attr("hair").eq("white")), page.last_evaluated_key))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.last_evaluated_key.is_some());
    }

    #[tokio::test]
    async fn test_query_sparse_global_index() {
        let backend = seeded(100).await;
        let mut aged = user("4", 1, "grey");
        aged.insert("age".to_string(), Value::from(823));
        backend.put_item("User", aged).await.unwrap();

        let page = backend
            .query(QueryRequest {
                table_name: "User".to_string(),
                index_name: Some("AgeIndex".to_string()),
                key_condition: key("age").eq(823),
                filter: None,
                exclusive_start_key: None,
            })
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].get("id"), Some(&Value::from("4")));
    }

    #[tokio::test]
    async fn test_query_unknown_index() {
        let backend = seeded(100).await;
        let result = backend
            .query(QueryRequest {
                table_name: "User".to_string(),
                index_name: Some("Nope".to_string()),
                key_condition: key("x").eq(1),
                filter: None,
                exclusive_start_key: None,
            })
            .await;
        assert!(matches!(result, Err(Error::Service(_))));
    }

    #[tokio::test]
    async fn test_update_return_values() {
        let backend = seeded(100).await;
        let plan = build_update(
            "User",
            &KeySchema::hash_range("id", "ts"),
            Fields::new()
                .with("id", "1")
                .with("ts", 1600000000)
                .with("hair", REMOVE_KEY)
                .with("age", 823),
        )
        .unwrap();

        let old = backend
            .update_item(UpdateRequest {
                table_name: "User".to_string(),
                plan: plan.clone(),
                return_values: ReturnValues::UpdatedOld,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old, Item::from([("hair".to_string(), Value::from("white"))]));

        let new = backend
            .update_item(UpdateRequest {
                table_name: "User".to_string(),
                plan,
                return_values: ReturnValues::AllNew,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(new.get("age"), Some(&Value::from(823)));
        assert!(!new.contains_key("hair"));
    }

    #[tokio::test]
    async fn test_update_creates_missing_row() {
        let backend = seeded(100).await;
        let plan = build_update(
            "User",
            &KeySchema::hash_range("id", "ts"),
            Fields::new().with("id", "9").with("ts", 9).with("hair", "red"),
        )
        .unwrap();

        let returned = backend
            .update_item(UpdateRequest {
                table_name: "User".to_string(),
                plan,
                return_values: ReturnValues::None,
            })
            .await
            .unwrap();

        assert_eq!(returned, None);
        let description = backend.describe_table("User").await.unwrap().unwrap();
        assert_eq!(description.item_count, 4);
    }

    #[tokio::test]
    async fn test_batch_delete_capacity() {
        let backend = seeded(100).await.with_batch_capacity(2);
        let keys = vec![
            Item::from([("id".to_string(), Value::from("1")), ("ts".to_string(), Value::from(1600000000))]),
            Item::from([("id".to_string(), Value::from("2")), ("ts".to_string(), Value::from(1700000000))]),
            Item::from([("id".to_string(), Value::from("3")), ("ts".to_string(), Value::from(1500000000))]),
        ];

        let unprocessed = backend.batch_delete("User", keys).await.unwrap();
        assert_eq!(unprocessed.len(), 1);
        assert_eq!(unprocessed[0].get("id"), Some(&Value::from("3")));

        let description = backend.describe_table("User").await.unwrap().unwrap();
        assert_eq!(description.item_count, 1);
    }

    #[tokio::test]
    async fn test_create_and_delete_table() {
        let backend = InMemoryBackend::new();
        backend.create_table(&user_definition()).await.unwrap();

        assert_eq!(
            backend.create_table(&user_definition()).await,
            Err(Error::TableAlreadyExists("User".to_string()))
        );
        assert_eq!(backend.list_tables().await.unwrap(), vec!["User".to_string()]);

        let description = backend.describe_table("User").await.unwrap().unwrap();
        assert!(description.is_ready());
        assert!(description.schema.index("AgeIndex").is_some());

        backend.delete_table("User").await.unwrap();
        assert_eq!(backend.describe_table("User").await.unwrap(), None);
        assert!(backend.delete_table("User").await.is_err());
    }
}
