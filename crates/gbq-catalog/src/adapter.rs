//! Warehouse seam: connections, result streams and catalog enumeration

use gbq_core::{ProjectId, Row, TableMetadata};

/// Errors reported by a warehouse backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarehouseError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Read failed: {0}")]
    ReadError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WarehouseError {
    /// Map a backend error message onto the closest variant
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("Not found") || message.contains("notFound") {
            Self::NotFound(message)
        } else if message.contains("Access Denied")
            || message.contains("Permission")
            || message.contains("accessDenied")
        {
            Self::PermissionDenied(message)
        } else {
            Self::QueryError(message)
        }
    }
}

/// Opens connections scoped to a project
#[async_trait::async_trait]
pub trait Warehouse: Send + Sync {
    /// Backend name (e.g. "BigQuery")
    fn name(&self) -> &'static str;

    /// Open a connection billed to and scoped on `project`
    async fn connect(&self, project: &ProjectId) -> Result<Box<dyn Connection>, WarehouseError>;
}

/// A live connection to one project
///
/// Dropping the connection releases it.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Project this connection is scoped to
    fn project(&self) -> &ProjectId;

    /// Submit SQL and return a lazy stream over its result rows
    async fn query(&self, sql: &str) -> Result<Box<dyn RowStream>, WarehouseError>;

    /// Enumerate dataset ids of this connection's project, in warehouse order
    async fn datasets(&self) -> Result<Box<dyn NameStream>, WarehouseError>;

    /// Enumerate table ids of a dataset in this connection's project
    async fn tables(&self, dataset_id: &str) -> Result<Box<dyn NameStream>, WarehouseError>;

    /// Fetch description, size and schema of a table
    async fn table_metadata(
        &self,
        dataset_id: &str,
        table_id: &str,
    ) -> Result<TableMetadata, WarehouseError>;
}

/// Forward-only, non-restartable sequence of result rows
#[async_trait::async_trait]
pub trait RowStream: Send {
    /// Pull the next row: `Ok(None)` at end of results, `Err` on a failed read
    async fn next(&mut self) -> Result<Option<Row>, WarehouseError>;

    /// Column names in schema order, once known
    ///
    /// Only guaranteed to be populated after the first row has been pulled,
    /// and may stay `None` if the backend reports no schema.
    fn schema(&self) -> Option<&[String]>;
}

/// Forward-only enumeration of dataset or table ids
#[async_trait::async_trait]
pub trait NameStream: Send {
    /// Pull the next id: `Ok(None)` once the listing is exhausted
    async fn next(&mut self) -> Result<Option<String>, WarehouseError>;
}
