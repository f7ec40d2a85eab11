//! Mock warehouse for testing
//!
//! Serves predefined catalogs and query results from memory without
//! connecting to any warehouse. Useful for:
//! - Unit testing catalog browsing and result streaming
//! - Verifying connections are released on every exit path
//! - Simulating connection, query, metadata and mid-stream read failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gbq_catalog::{MockWarehouseBuilder, MockQuery};
//! use gbq_core::Value;
//!
//! let warehouse = MockWarehouseBuilder::new()
//!     .with_datasets("my-proj", ["sales", "marketing"])
//!     .with_query("SELECT 1 as test_value", MockQuery::new(["test_value"], vec![vec![Value::Int(1)]]))
//!     .build();
//!
//! let conn = warehouse.connect(&ProjectId::new("my-proj")?).await?;
//! assert_eq!(warehouse.live_connections(), 1);
//! ```
//!
//! Listings are returned in insertion order, never sorted.

use crate::adapter::{Connection, NameStream, RowStream, Warehouse, WarehouseError};
use gbq_core::{ProjectId, Row, TableMetadata};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Canned result of a query
#[derive(Debug, Clone, Default)]
pub struct MockQuery {
    /// Column names, or `None` to simulate a source that yields no schema
    pub schema: Option<Vec<String>>,

    pub rows: Vec<Row>,

    /// Fail with this error once `usize` rows have been pulled
    pub fail_after: Option<(usize, WarehouseError)>,
}

impl MockQuery {
    pub fn new<I, S>(schema: I, rows: Vec<Row>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: Some(schema.into_iter().map(Into::into).collect()),
            rows,
            fail_after: None,
        }
    }

    /// Rows with no schema attached
    pub fn without_schema(rows: Vec<Row>) -> Self {
        Self {
            schema: None,
            rows,
            fail_after: None,
        }
    }

    /// A query that succeeds but returns no rows
    pub fn empty<I, S>(schema: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(schema, Vec::new())
    }

    pub fn failing_after(mut self, rows: usize, error: WarehouseError) -> Self {
        self.fail_after = Some((rows, error));
        self
    }
}

#[derive(Default)]
struct MockCatalog {
    /// project -> dataset ids in listing order
    datasets: HashMap<String, Vec<String>>,

    /// `project.dataset` -> table ids in listing order
    tables: HashMap<String, Vec<String>>,

    /// `project.dataset.table` -> metadata
    metadata: HashMap<String, TableMetadata>,

    /// `project.dataset.table` -> error
    metadata_errors: HashMap<String, WarehouseError>,

    queries: HashMap<String, MockQuery>,

    query_errors: HashMap<String, WarehouseError>,

    /// project -> (entries served before failing, error)
    listing_errors: HashMap<String, (usize, WarehouseError)>,

    unreachable_projects: HashSet<String>,
}

/// Counters observed by tests
#[derive(Default)]
struct MockStats {
    opened: AtomicUsize,
    live: AtomicUsize,
    rows_pulled: AtomicUsize,
    names_pulled: AtomicUsize,
    connected_projects: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

/// Mock warehouse for testing
///
/// Clones share catalog and counters.
#[derive(Clone)]
pub struct MockWarehouse {
    catalog: Arc<RwLock<MockCatalog>>,
    stats: Arc<MockStats>,
    latency_ms: u64,
}

impl MockWarehouse {
    /// Create a mock warehouse with an empty catalog
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(MockCatalog::default())),
            stats: Arc::new(MockStats::default()),
            latency_ms: 0,
        }
    }

    /// Configure simulated latency for connect and every pull
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Register a canned result for an exact SQL string
    pub async fn add_query(&self, sql: &str, query: MockQuery) {
        self.catalog.write().await.queries.insert(sql.to_string(), query);
    }

    /// Register table metadata
    pub async fn add_table(&self, project: &str, dataset: &str, table: &str, metadata: TableMetadata) {
        let mut catalog = self.catalog.write().await;
        insert_table(&mut catalog, project, dataset, table, metadata);
    }

    /// Connections opened so far
    pub fn opened_connections(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    /// Connections opened and not yet released
    pub fn live_connections(&self) -> usize {
        self.stats.live.load(Ordering::SeqCst)
    }

    /// Rows handed out across all result streams
    pub fn rows_pulled(&self) -> usize {
        self.stats.rows_pulled.load(Ordering::SeqCst)
    }

    /// Dataset/table ids handed out across all listings
    pub fn names_pulled(&self) -> usize {
        self.stats.names_pulled.load(Ordering::SeqCst)
    }

    /// Projects passed to `connect`, in call order
    pub fn connected_projects(&self) -> Vec<String> {
        self.stats
            .connected_projects
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// SQL submitted across all connections, in call order
    pub fn submitted_queries(&self) -> Vec<String> {
        self.stats
            .queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    async fn simulate_latency(latency_ms: u64) {
        if latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency_ms)).await;
        }
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_table(
    catalog: &mut MockCatalog,
    project: &str,
    dataset: &str,
    table: &str,
    metadata: TableMetadata,
) {
    let tables = catalog
        .tables
        .entry(format!("{}.{}", project, dataset))
        .or_default();
    if !tables.iter().any(|t| t == table) {
        tables.push(table.to_string());
    }
    catalog
        .metadata
        .insert(format!("{}.{}.{}", project, dataset, table), metadata);
}

#[async_trait::async_trait]
impl Warehouse for MockWarehouse {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn connect(&self, project: &ProjectId) -> Result<Box<dyn Connection>, WarehouseError> {
        Self::simulate_latency(self.latency_ms).await;

        if let Ok(mut projects) = self.stats.connected_projects.lock() {
            projects.push(project.to_string());
        }

        if self
            .catalog
            .read()
            .await
            .unreachable_projects
            .contains(project.as_str())
        {
            return Err(WarehouseError::NetworkError(format!(
                "Simulated connection failure for project {}",
                project
            )));
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockConnection {
            catalog: Arc::clone(&self.catalog),
            stats: Arc::clone(&self.stats),
            project: project.clone(),
            latency_ms: self.latency_ms,
        }))
    }
}

/// Connection handed out by [`MockWarehouse`]; decrements the live count on drop
pub struct MockConnection {
    catalog: Arc<RwLock<MockCatalog>>,
    stats: Arc<MockStats>,
    project: ProjectId,
    latency_ms: u64,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Connection for MockConnection {
    fn project(&self) -> &ProjectId {
        &self.project
    }

    async fn query(&self, sql: &str) -> Result<Box<dyn RowStream>, WarehouseError> {
        MockWarehouse::simulate_latency(self.latency_ms).await;

        if let Ok(mut queries) = self.stats.queries.lock() {
            queries.push(sql.to_string());
        }

        let catalog = self.catalog.read().await;
        if let Some(error) = catalog.query_errors.get(sql) {
            return Err(error.clone());
        }
        let query = catalog
            .queries
            .get(sql)
            .cloned()
            .ok_or_else(|| WarehouseError::QueryError(format!("Unrecognized query: {}", sql)))?;

        Ok(Box::new(MockRowStream {
            schema: query.schema,
            schema_visible: false,
            rows: query.rows.into(),
            pulled: 0,
            fail_after: query.fail_after,
            stats: Arc::clone(&self.stats),
            latency_ms: self.latency_ms,
        }))
    }

    async fn datasets(&self) -> Result<Box<dyn NameStream>, WarehouseError> {
        let catalog = self.catalog.read().await;
        let names = catalog
            .datasets
            .get(self.project.as_str())
            .cloned()
            .unwrap_or_default();
        let fail_after = catalog.listing_errors.get(self.project.as_str()).cloned();

        Ok(Box::new(MockNameStream {
            names: names.into(),
            pulled: 0,
            fail_after,
            stats: Arc::clone(&self.stats),
        }))
    }

    async fn tables(&self, dataset_id: &str) -> Result<Box<dyn NameStream>, WarehouseError> {
        let key = format!("{}.{}", self.project, dataset_id);
        let catalog = self.catalog.read().await;

        let known_dataset = catalog
            .datasets
            .get(self.project.as_str())
            .is_some_and(|d| d.iter().any(|id| id == dataset_id));
        let names = match catalog.tables.get(&key) {
            Some(names) => names.clone(),
            None if known_dataset => Vec::new(),
            None => return Err(WarehouseError::NotFound(format!("Dataset {}", key))),
        };

        Ok(Box::new(MockNameStream {
            names: names.into(),
            pulled: 0,
            fail_after: None,
            stats: Arc::clone(&self.stats),
        }))
    }

    async fn table_metadata(
        &self,
        dataset_id: &str,
        table_id: &str,
    ) -> Result<TableMetadata, WarehouseError> {
        MockWarehouse::simulate_latency(self.latency_ms).await;

        let fqn = format!("{}.{}.{}", self.project, dataset_id, table_id);
        let catalog = self.catalog.read().await;

        if let Some(error) = catalog.metadata_errors.get(&fqn) {
            return Err(error.clone());
        }

        catalog
            .metadata
            .get(&fqn)
            .cloned()
            .ok_or_else(|| WarehouseError::NotFound(format!("Table {}", fqn)))
    }
}

struct MockRowStream {
    schema: Option<Vec<String>>,
    schema_visible: bool,
    rows: VecDeque<Row>,
    pulled: usize,
    fail_after: Option<(usize, WarehouseError)>,
    stats: Arc<MockStats>,
    latency_ms: u64,
}

#[async_trait::async_trait]
impl RowStream for MockRowStream {
    async fn next(&mut self) -> Result<Option<Row>, WarehouseError> {
        MockWarehouse::simulate_latency(self.latency_ms).await;

        if let Some((after, error)) = &self.fail_after {
            if self.pulled >= *after {
                return Err(error.clone());
            }
        }

        let row = self.rows.pop_front();
        if row.is_some() {
            self.pulled += 1;
            self.schema_visible = true;
            self.stats.rows_pulled.fetch_add(1, Ordering::SeqCst);
        }
        Ok(row)
    }

    fn schema(&self) -> Option<&[String]> {
        if self.schema_visible {
            self.schema.as_deref()
        } else {
            None
        }
    }
}

struct MockNameStream {
    names: VecDeque<String>,
    pulled: usize,
    fail_after: Option<(usize, WarehouseError)>,
    stats: Arc<MockStats>,
}

#[async_trait::async_trait]
impl NameStream for MockNameStream {
    async fn next(&mut self) -> Result<Option<String>, WarehouseError> {
        if let Some((after, error)) = &self.fail_after {
            if self.pulled >= *after {
                return Err(error.clone());
            }
        }

        let name = self.names.pop_front();
        if name.is_some() {
            self.pulled += 1;
            self.stats.names_pulled.fetch_add(1, Ordering::SeqCst);
        }
        Ok(name)
    }
}

/// Builder for creating a [`MockWarehouse`] with a predefined catalog
///
/// # Example
///
/// ```rust,ignore
/// let warehouse = MockWarehouseBuilder::new()
///     .with_datasets("bigquery-public-data", ["samples", "usa_names"])
///     .with_table("bigquery-public-data", "samples", "shakespeare", metadata)
///     .with_unreachable_project("broken-proj")
///     .build();
/// ```
#[derive(Default)]
pub struct MockWarehouseBuilder {
    catalog: MockCatalog,
    latency_ms: u64,
}

impl MockWarehouseBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append datasets to a project's listing, preserving order
    pub fn with_datasets<I, S>(mut self, project: &str, datasets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog
            .datasets
            .entry(project.to_string())
            .or_default()
            .extend(datasets.into_iter().map(Into::into));
        self
    }

    /// Append tables to a dataset's listing without metadata
    pub fn with_tables<I, S>(mut self, project: &str, dataset: &str, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog
            .tables
            .entry(format!("{}.{}", project, dataset))
            .or_default()
            .extend(tables.into_iter().map(Into::into));
        self
    }

    /// Add a table with metadata (also appended to the dataset's listing)
    pub fn with_table(mut self, project: &str, dataset: &str, table: &str, metadata: TableMetadata) -> Self {
        insert_table(&mut self.catalog, project, dataset, table, metadata);
        self
    }

    /// Fail metadata lookups for a table
    pub fn with_metadata_error(
        mut self,
        project: &str,
        dataset: &str,
        table: &str,
        error: WarehouseError,
    ) -> Self {
        self.catalog
            .metadata_errors
            .insert(format!("{}.{}.{}", project, dataset, table), error);
        self
    }

    /// Serve a canned result for an exact SQL string
    pub fn with_query(mut self, sql: &str, query: MockQuery) -> Self {
        self.catalog.queries.insert(sql.to_string(), query);
        self
    }

    /// Reject an exact SQL string at submission
    pub fn with_query_error(mut self, sql: &str, error: WarehouseError) -> Self {
        self.catalog.query_errors.insert(sql.to_string(), error);
        self
    }

    /// Fail a project's dataset listing after `after` entries
    pub fn with_listing_error(mut self, project: &str, after: usize, error: WarehouseError) -> Self {
        self.catalog
            .listing_errors
            .insert(project.to_string(), (after, error));
        self
    }

    /// Make `connect` fail for a project
    pub fn with_unreachable_project(mut self, project: &str) -> Self {
        self.catalog.unreachable_projects.insert(project.to_string());
        self
    }

    /// Configure latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Build the MockWarehouse
    pub fn build(self) -> MockWarehouse {
        MockWarehouse {
            catalog: Arc::new(RwLock::new(self.catalog)),
            stats: Arc::new(MockStats::default()),
            latency_ms: self.latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbq_core::{FieldDescriptor, Value};

    fn project(id: &str) -> ProjectId {
        ProjectId::new(id).unwrap()
    }

    async fn drain(mut stream: Box<dyn NameStream>) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(name) = stream.next().await.unwrap() {
            names.push(name);
        }
        names
    }

    #[tokio::test]
    async fn test_connection_counting() {
        let warehouse = MockWarehouse::new();

        let first = warehouse.connect(&project("a")).await.unwrap();
        let second = warehouse.connect(&project("b")).await.unwrap();
        assert_eq!(warehouse.opened_connections(), 2);
        assert_eq!(warehouse.live_connections(), 2);

        drop(first);
        assert_eq!(warehouse.live_connections(), 1);
        drop(second);
        assert_eq!(warehouse.live_connections(), 0);
        assert_eq!(warehouse.connected_projects(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unreachable_project() {
        let warehouse = MockWarehouseBuilder::new()
            .with_unreachable_project("down")
            .build();

        let result = warehouse.connect(&project("down")).await;
        assert!(matches!(result, Err(WarehouseError::NetworkError(_))));
        assert_eq!(warehouse.live_connections(), 0);
    }

    #[tokio::test]
    async fn test_listing_preserves_order() {
        let warehouse = MockWarehouseBuilder::new()
            .with_datasets("p", ["zeta", "alpha", "mid"])
            .build();

        let conn = warehouse.connect(&project("p")).await.unwrap();
        let names = drain(conn.datasets().await.unwrap()).await;
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_listing_error_after_entries() {
        let warehouse = MockWarehouseBuilder::new()
            .with_datasets("p", ["a", "b", "c"])
            .with_listing_error("p", 1, WarehouseError::NetworkError("reset".into()))
            .build();

        let conn = warehouse.connect(&project("p")).await.unwrap();
        let mut stream = conn.datasets().await.unwrap();
        assert_eq!(stream.next().await.unwrap().as_deref(), Some("a"));
        assert!(stream.next().await.is_err());
    }

    #[tokio::test]
    async fn test_tables_of_unknown_dataset() {
        let warehouse = MockWarehouse::new();
        let conn = warehouse.connect(&project("p")).await.unwrap();
        assert!(matches!(
            conn.tables("nope").await.err(),
            Some(WarehouseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_table_registers_listing_and_metadata() {
        let warehouse = MockWarehouse::new();
        let metadata = TableMetadata::new(3, 30, vec![FieldDescriptor::new("id", "INTEGER")]);
        warehouse.add_table("p", "ds", "t1", metadata.clone()).await;

        let conn = warehouse.connect(&project("p")).await.unwrap();
        assert_eq!(drain(conn.tables("ds").await.unwrap()).await, vec!["t1"]);
        assert_eq!(conn.table_metadata("ds", "t1").await.unwrap(), metadata);
        assert!(matches!(
            conn.table_metadata("ds", "missing").await,
            Err(WarehouseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_schema_visible_after_first_row() {
        let warehouse = MockWarehouseBuilder::new()
            .with_query("q", MockQuery::new(["n"], vec![vec![Value::Int(1)]]))
            .build();

        let conn = warehouse.connect(&project("p")).await.unwrap();
        let mut rows = conn.query("q").await.unwrap();
        assert!(rows.schema().is_none());

        assert_eq!(rows.next().await.unwrap(), Some(vec![Value::Int(1)]));
        assert_eq!(rows.schema(), Some(&["n".to_string()][..]));
        assert_eq!(rows.next().await.unwrap(), None);
        assert_eq!(warehouse.rows_pulled(), 1);
    }

    #[tokio::test]
    async fn test_read_error_after_rows() {
        let query = MockQuery::new(["n"], vec![vec![Value::Int(1)], vec![Value::Int(2)]])
            .failing_after(1, WarehouseError::ReadError("boom".into()));
        let warehouse = MockWarehouseBuilder::new().with_query("q", query).build();

        let conn = warehouse.connect(&project("p")).await.unwrap();
        let mut rows = conn.query("q").await.unwrap();
        assert!(rows.next().await.unwrap().is_some());
        assert_eq!(
            rows.next().await,
            Err(WarehouseError::ReadError("boom".into()))
        );
    }

    #[tokio::test]
    async fn test_unknown_query_is_error() {
        let warehouse = MockWarehouse::new();
        let conn = warehouse.connect(&project("p")).await.unwrap();
        assert!(matches!(
            conn.query("SELECT nope").await.err(),
            Some(WarehouseError::QueryError(_))
        ));
        assert_eq!(warehouse.submitted_queries(), vec!["SELECT nope"]);
    }
}
