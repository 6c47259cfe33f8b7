//! The table registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use dynamesa_core::schema::format_summary;
use dynamesa_core::{Item, Record, TableDefinition, TableDescription};

use crate::backend::TableBackend;
use crate::config::{Config, WaitConfig};
use crate::error::{Error, Result};
use crate::table::{Table, TableInner};

type Cache = Arc<RwLock<HashMap<String, Arc<TableInner>>>>;

/// Resolves table names to cached handles.
///
/// A name missing from the cache triggers one full listing of the
/// database's tables. A registry can be scoped to a name prefix, in which
/// case every name passed in is prefixed and only matching tables are
/// listed. Scoped views share the cache of the registry they came from.
#[derive(Clone)]
pub struct Tables {
    backend: Arc<dyn TableBackend>,
    prefix: String,
    wait: WaitConfig,
    cache: Cache,
}

impl fmt::Debug for Tables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tables")
            .field("prefix", &self.prefix)
            .field("wait", &self.wait)
            .finish()
    }
}

impl Tables {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self {
            backend,
            prefix: String::new(),
            wait: WaitConfig::default(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Builds a DynamoDB-backed registry from configuration.
    #[cfg(feature = "dynamodb")]
    pub async fn configure(config: Config) -> Self {
        let backend = crate::backend::dynamodb::DynamoDbBackend::from_config(&config).await;
        Self::new(Arc::new(backend)).with_config(&config)
    }

    /// Applies the registry settings of `config` (prefix and waits).
    pub fn with_config(mut self, config: &Config) -> Self {
        self.wait = config.wait;
        if let Some(prefix) = &config.table_prefix {
            self.prefix = prefix.clone();
        }
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// A view of this registry scoped to `prefix`.
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..self.clone()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend(&self) -> &Arc<dyn TableBackend> {
        &self.backend
    }

    fn full_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Lists the database's tables and repopulates the cache.
    ///
    /// Only tables matching the prefix are touched. Handles for tables that
    /// are still there keep their cached description.
    pub async fn reload(&self) -> Result<()> {
        let names: Vec<String> = self
            .backend
            .list_tables()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&self.prefix))
            .collect();

        let mut cache = self.cache.write().await;
        cache.retain(|name, _| !name.starts_with(&self.prefix) || names.contains(name));
        for name in names {
            cache
                .entry(name.clone())
                .or_insert_with(|| Arc::new(TableInner::new(name, Arc::clone(&self.backend))));
        }

        tracing::trace!(prefix = %self.prefix, tables = cache.len(), "Reloaded tables");
        Ok(())
    }

    async fn cached(&self, full_name: &str) -> Option<Arc<TableInner>> {
        self.cache.read().await.get(full_name).cloned()
    }

    /// Returns the handle for `name`, reading rows as `T`.
    pub async fn get<T: Record>(&self, name: &str) -> Result<Table<T>> {
        let full_name = self.full_name(name);

        if let Some(inner) = self.cached(&full_name).await {
            tracing::trace!(table = %full_name, "Table cache hit");
            return Ok(Table::from_inner(inner));
        }

        tracing::trace!(table = %full_name, "Table cache miss");
        self.reload().await?;

        self.cached(&full_name)
            .await
            .map(Table::from_inner)
            .ok_or(Error::TableNotFound(full_name))
    }

    /// Returns the handle for `name`, reading rows as plain items.
    pub async fn table(&self, name: &str) -> Result<Table<Item>> {
        self.get(name).await
    }

    /// Handles for every table matching the prefix, sorted by name.
    pub async fn list(&self) -> Result<Vec<Table<Item>>> {
        let has_entries = {
            let cache = self.cache.read().await;
            cache.keys().any(|name| name.starts_with(&self.prefix))
        };
        if !has_entries {
            self.reload().await?;
        }

        let cache = self.cache.read().await;
        let mut tables: Vec<Table<Item>> = cache
            .iter()
            .filter(|(name, _)| name.starts_with(&self.prefix))
            .map(|(_, inner)| Table::from_inner(Arc::clone(inner)))
            .collect();
        tables.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(tables)
    }

    /// Renders every listed table with its creation date and item count.
    pub async fn summary(&self) -> Result<String> {
        let mut descriptions = Vec::new();
        for table in self.list().await? {
            if let Some(description) = self.backend.describe_table(table.name()).await? {
                descriptions.push(description);
            }
        }
        Ok(format_summary(&descriptions))
    }

    /// Creates a table and waits until it and its indexes are active.
    ///
    /// The registry prefix is prepended to the definition's name.
    pub async fn create(&self, definition: TableDefinition) -> Result<Table<Item>> {
        let full_name = self.full_name(&definition.table_name);
        let definition = definition.with_table_name(&full_name);
        definition.validate()?;

        self.backend.create_table(&definition).await?;
        tracing::info!(table = %full_name, "Created table, waiting for it to become active");

        let description = self.wait_until_active(&full_name).await?;
        let inner = Arc::new(TableInner::with_description(
            Arc::clone(&self.backend),
            description,
        ));
        self.cache
            .write()
            .await
            .insert(full_name, Arc::clone(&inner));

        Ok(Table::from_inner(inner))
    }

    /// Deletes the table `name` and waits until it is gone.
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.delete_full_name(&self.full_name(name)).await
    }

    /// Deletes the table behind a handle and waits until it is gone.
    pub async fn delete_table<T: Record>(&self, table: &Table<T>) -> Result<()> {
        self.delete_full_name(table.name()).await
    }

    async fn delete_full_name(&self, full_name: &str) -> Result<()> {
        self.backend.delete_table(full_name).await?;
        self.cache.write().await.remove(full_name);
        tracing::info!(table = %full_name, "Deleted table, waiting for it to disappear");

        self.wait_until_gone(full_name).await
    }

    async fn wait_until_active(&self, full_name: &str) -> Result<TableDescription> {
        for _ in 0..self.wait.max_attempts {
            if let Some(description) = self.backend.describe_table(full_name).await? {
                if description.is_ready() {
                    return Ok(description);
                }
            }
            tokio::time::sleep(self.wait.delay).await;
        }

        Err(Error::WaitTimeout {
            table: full_name.to_string(),
            state: "active",
        })
    }

    async fn wait_until_gone(&self, full_name: &str) -> Result<()> {
        for _ in 0..self.wait.max_attempts {
            if self.backend.describe_table(full_name).await?.is_none() {
                return Ok(());
            }
            tokio::time::sleep(self.wait.delay).await;
        }

        Err(Error::WaitTimeout {
            table: full_name.to_string(),
            state: "deleted",
        })
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::inmemory::InMemoryBackend;
    use dynamesa_core::{AttributeType, Fields, FindArgs};
    use futures_util::TryStreamExt;

    fn fast_wait() -> WaitConfig {
        WaitConfig {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        }
    }

    async fn backend_with(names: &[&str]) -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        for name in names {
            backend
                .create_table(&TableDefinition::new(*name, ("id", AttributeType::String)))
                .await
                .unwrap();
        }
        backend
    }

    fn registry(backend: &InMemoryBackend) -> Tables {
        Tables::new(Arc::new(backend.clone())).with_wait(fast_wait())
    }

    fn names(tables: &[Table<Item>]) -> Vec<&str> {
        tables.iter().map(|t| t.name()).collect()
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let backend = backend_with(&["User", "Event", "Calendar"]).await;
        let tables = registry(&backend);

        assert_eq!(
            names(&tables.list().await.unwrap()),
            vec!["Calendar", "Event", "User"]
        );
    }

    #[tokio::test]
    async fn test_prefix_scopes_names_and_listing() {
        let backend = backend_with(&["dev_User", "dev_Event", "prod_User"]).await;
        let dev = registry(&backend).with_prefix("dev_");

        assert_eq!(dev.prefix(), "dev_");
        assert_eq!(
            names(&dev.list().await.unwrap()),
            vec!["dev_Event", "dev_User"]
        );
        assert_eq!(dev.table("User").await.unwrap().name(), "dev_User");
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let backend = backend_with(&["dev_User"]).await;
        let dev = registry(&backend).with_prefix("dev_");

        let err = dev.table("Event").await.unwrap_err();

        assert_eq!(err, Error::TableNotFound("dev_Event".to_string()));
    }

    #[tokio::test]
    async fn test_cache_miss_reloads() {
        let backend = backend_with(&["User"]).await;
        let tables = registry(&backend);
        assert_eq!(tables.list().await.unwrap().len(), 1);

        backend
            .create_table(&TableDefinition::new("Late", ("id", AttributeType::String)))
            .await
            .unwrap();

        assert_eq!(tables.table("Late").await.unwrap().name(), "Late");
        assert_eq!(tables.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reload_drops_vanished_tables() {
        let backend = backend_with(&["User", "Event"]).await;
        let tables = registry(&backend);
        assert_eq!(tables.list().await.unwrap().len(), 2);

        backend.delete_table("Event").await.unwrap();
        tables.reload().await.unwrap();

        assert_eq!(names(&tables.list().await.unwrap()), vec!["User"]);
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let backend = backend_with(&[]).await;
        let tables = registry(&backend).with_prefix("test_");

        let table = tables
            .create(
                TableDefinition::new("Temp", ("id", AttributeType::String, "ts", AttributeType::Number))
                    .with_global_index("AgeIndex", ("age", AttributeType::Number)),
            )
            .await
            .unwrap();
        assert_eq!(table.name(), "test_Temp");
        assert_eq!(backend.list_tables().await.unwrap(), vec!["test_Temp"]);

        table
            .put(&Fields::new().with("id", "1").with("ts", 1).with("age", 30))
            .await
            .unwrap();
        let rows: Vec<Item> = tables
            .table("Temp")
            .await
            .unwrap()
            .find(FindArgs::new().on("AgeIndex").eq("age", 30))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        tables.delete("Temp").await.unwrap();
        assert!(backend.list_tables().await.unwrap().is_empty());
        assert!(tables.table("Temp").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_existing_table() {
        let backend = backend_with(&["User"]).await;
        let tables = registry(&backend);

        let err = tables
            .create(TableDefinition::new("User", ("id", AttributeType::String)))
            .await
            .unwrap_err();

        assert_eq!(err, Error::TableAlreadyExists("User".to_string()));
    }

    #[tokio::test]
    async fn test_delete_table_by_handle() {
        let backend = backend_with(&["User"]).await;
        let tables = registry(&backend);
        let table = tables.table("User").await.unwrap();

        tables.delete_table(&table).await.unwrap();

        assert!(tables.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scoped_views_share_cache() {
        let backend = backend_with(&[]).await;
        let tables = registry(&backend);

        tables
            .with_prefix("test_")
            .create(TableDefinition::new("Temp", ("id", AttributeType::String)))
            .await
            .unwrap();

        // Served from the shared cache without listing again.
        backend.delete_table("test_Temp").await.unwrap();
        assert_eq!(tables.table("test_Temp").await.unwrap().name(), "test_Temp");
    }

    #[tokio::test]
    async fn test_summary() {
        let backend = backend_with(&["User", "Event"]).await;
        let tables = registry(&backend);
        tables
            .table("User")
            .await
            .unwrap()
            .put(&Fields::new().with("id", "1"))
            .await
            .unwrap();

        let summary = tables.summary().await.unwrap();
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines[0], "Dynamesa Tables:");
        assert!(lines[1].starts_with("  Event  ("));
        assert!(lines[1].ends_with(", 0 items)"));
        assert!(lines[2].starts_with("  User   ("));
        assert!(lines[2].ends_with(", 1 items)"));
    }

    #[test]
    fn test_with_config_applies_prefix_and_wait() {
        let config = Config::default()
            .with_table_prefix("dev_")
            .with_wait(fast_wait());

        let tables = Tables::new(Arc::new(InMemoryBackend::new())).with_config(&config);

        assert_eq!(tables.prefix(), "dev_");
        assert_eq!(tables.wait, fast_wait());
    }
}
