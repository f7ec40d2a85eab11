//! BigQuery warehouse backed by the BigQuery REST API
//!
//! Every [`Warehouse::connect`] call authenticates a fresh client, so a
//! connection to `bigquery-public-data` opened for one operation is fully
//! independent of the session's primary connection.
//!
//! ## Authentication
//!
//! 1. Service account JSON file (explicit path)
//! 2. Application Default Credentials (ADC)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let warehouse = BigQueryWarehouse::with_adc();
//! let conn = warehouse.connect(&ProjectId::new("my-project")?).await?;
//! let mut rows = conn.query("SELECT 1 as test_value").await?;
//! ```
//!
//! Result rows and catalog listings are fetched page by page as the caller
//! pulls them.

use crate::adapter::{Connection, Warehouse, WarehouseError};
use gbq_core::ProjectId;
use std::path::PathBuf;

#[cfg(feature = "bigquery")]
use crate::adapter::{NameStream, RowStream};

#[cfg(feature = "bigquery")]
use gbq_core::{decode_cell, FieldDescriptor, FieldMode, Row, TableMetadata, Value};
#[cfg(feature = "bigquery")]
use gcp_bigquery_client::{
    model::{
        get_query_results_parameters::GetQueryResultsParameters,
        query_request::QueryRequest,
        table_field_schema::TableFieldSchema,
        table_row::TableRow,
    },
    Client as BigQueryClient,
};
#[cfg(feature = "bigquery")]
use std::{collections::VecDeque, sync::Arc};

/// Page size requested when enumerating datasets and tables
#[cfg(feature = "bigquery")]
const LIST_PAGE_SIZE: u64 = 50;

/// How the warehouse authenticates new connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// GOOGLE_APPLICATION_CREDENTIALS, gcloud defaults, or the metadata server
    ApplicationDefault,

    /// A service account key file
    ServiceAccountFile(PathBuf),
}

/// BigQuery warehouse
#[derive(Debug, Clone)]
pub struct BigQueryWarehouse {
    credentials: Credentials,
}

impl BigQueryWarehouse {
    /// Authenticate with Application Default Credentials
    pub fn with_adc() -> Self {
        Self {
            credentials: Credentials::ApplicationDefault,
        }
    }

    /// Authenticate with a service account key file
    pub fn from_service_account_file(key_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials: Credentials::ServiceAccountFile(key_path.into()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[cfg(feature = "bigquery")]
    async fn client(&self) -> Result<BigQueryClient, WarehouseError> {
        match &self.credentials {
            Credentials::ApplicationDefault => BigQueryClient::from_application_default_credentials()
                .await
                .map_err(|e| WarehouseError::AuthenticationError(format!(
                    "Failed to authenticate with ADC: {}. \
                     Ensure GOOGLE_APPLICATION_CREDENTIALS is set or run 'gcloud auth application-default login'",
                    e
                ))),
            Credentials::ServiceAccountFile(path) => {
                let path_str = path.to_string_lossy().to_string();
                BigQueryClient::from_service_account_key_file(&path_str)
                    .await
                    .map_err(|e| WarehouseError::AuthenticationError(format!(
                        "Failed to read service account key file '{}': {}",
                        path_str, e
                    )))
            }
        }
    }
}

#[async_trait::async_trait]
impl Warehouse for BigQueryWarehouse {
    fn name(&self) -> &'static str {
        "BigQuery"
    }

    #[cfg(feature = "bigquery")]
    async fn connect(&self, project: &ProjectId) -> Result<Box<dyn Connection>, WarehouseError> {
        let client = self.client().await?;
        tracing::debug!(project = %project, "opened BigQuery client");
        Ok(Box::new(BigQueryConnection {
            client: Arc::new(client),
            project: project.clone(),
        }))
    }

    #[cfg(not(feature = "bigquery"))]
    async fn connect(&self, project: &ProjectId) -> Result<Box<dyn Connection>, WarehouseError> {
        let _ = project;
        Err(WarehouseError::ConfigError(
            "BigQuery support not compiled. Rebuild with: cargo build --features bigquery".to_string()
        ))
    }
}

/// Connection to one BigQuery project
#[cfg(feature = "bigquery")]
pub struct BigQueryConnection {
    client: Arc<BigQueryClient>,
    project: ProjectId,
}

#[cfg(feature = "bigquery")]
impl Drop for BigQueryConnection {
    fn drop(&mut self) {
        tracing::debug!(project = %self.project, "released BigQuery client");
    }
}

#[cfg(feature = "bigquery")]
#[async_trait::async_trait]
impl Connection for BigQueryConnection {
    fn project(&self) -> &ProjectId {
        &self.project
    }

    async fn query(&self, sql: &str) -> Result<Box<dyn RowStream>, WarehouseError> {
        let response = self
            .client
            .job()
            .query(self.project.as_str(), QueryRequest::new(sql.to_string()))
            .await
            .map_err(|e| WarehouseError::classify(e.to_string()))?;

        let (job_id, location) = response
            .job_reference
            .map(|r| (r.job_id, r.location))
            .unwrap_or((None, None));

        let mut stream = BigQueryRowStream {
            client: Arc::clone(&self.client),
            project_id: self.project.as_str().to_string(),
            job_id,
            location,
            fields: None,
            names: None,
            buffer: VecDeque::new(),
            page_token: response.page_token,
            job_complete: response.job_complete.unwrap_or(true),
        };
        stream.absorb_schema(response.schema.and_then(|s| s.fields));
        stream.buffer.extend(response.rows.unwrap_or_default());

        Ok(Box::new(stream))
    }

    async fn datasets(&self) -> Result<Box<dyn NameStream>, WarehouseError> {
        Ok(Box::new(DatasetNames {
            client: Arc::clone(&self.client),
            project_id: self.project.as_str().to_string(),
            pages: PageCursor::default(),
        }))
    }

    async fn tables(&self, dataset_id: &str) -> Result<Box<dyn NameStream>, WarehouseError> {
        Ok(Box::new(TableNames {
            client: Arc::clone(&self.client),
            project_id: self.project.as_str().to_string(),
            dataset_id: dataset_id.to_string(),
            pages: PageCursor::default(),
        }))
    }

    async fn table_metadata(
        &self,
        dataset_id: &str,
        table_id: &str,
    ) -> Result<TableMetadata, WarehouseError> {
        let table = self
            .client
            .table()
            .get(self.project.as_str(), dataset_id, table_id, None)
            .await
            .map_err(|e| WarehouseError::classify(e.to_string()))?;

        let schema = table
            .schema
            .fields
            .unwrap_or_default()
            .iter()
            .map(field_descriptor)
            .collect();

        Ok(TableMetadata {
            description: table.description.unwrap_or_default(),
            row_count: parse_count(table.num_rows.as_deref()),
            byte_size: parse_count(table.num_bytes.as_deref()),
            schema,
        })
    }
}

/// Counts arrive as decimal strings; absent or malformed counts read as 0
#[cfg(feature = "bigquery")]
fn parse_count(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Convert an API schema field, keeping nested RECORD fields
#[cfg(feature = "bigquery")]
fn field_descriptor(field: &TableFieldSchema) -> FieldDescriptor {
    // FieldType serializes to the API's upper-case type name
    let field_type = serde_json::to_value(&field.r#type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", field.r#type).to_uppercase());

    FieldDescriptor {
        name: field.name.clone(),
        field_type,
        description: field.description.clone().unwrap_or_default(),
        mode: FieldMode::from_api(field.mode.as_deref()),
        fields: field
            .fields
            .as_ref()
            .map(|sub| sub.iter().map(field_descriptor).collect())
            .unwrap_or_default(),
    }
}

/// Rows of a query job, pulled page by page from `getQueryResults`
#[cfg(feature = "bigquery")]
struct BigQueryRowStream {
    client: Arc<BigQueryClient>,
    project_id: String,
    job_id: Option<String>,
    location: Option<String>,
    fields: Option<Vec<FieldDescriptor>>,
    names: Option<Vec<String>>,
    buffer: VecDeque<TableRow>,
    page_token: Option<String>,
    job_complete: bool,
}

#[cfg(feature = "bigquery")]
impl BigQueryRowStream {
    fn absorb_schema(&mut self, fields: Option<Vec<TableFieldSchema>>) {
        if self.fields.is_some() {
            return;
        }
        if let Some(fields) = fields {
            let fields: Vec<FieldDescriptor> = fields.iter().map(field_descriptor).collect();
            self.names = Some(fields.iter().map(|f| f.name.clone()).collect());
            self.fields = Some(fields);
        }
    }

    async fn fetch_page(&mut self, job_id: &str) -> Result<(), WarehouseError> {
        let params = GetQueryResultsParameters {
            page_token: self.page_token.clone(),
            location: self.location.clone(),
            ..Default::default()
        };

        let response = self
            .client
            .job()
            .get_query_results(&self.project_id, job_id, params)
            .await
            .map_err(|e| WarehouseError::ReadError(e.to_string()))?;

        self.job_complete = response.job_complete.unwrap_or(true);
        self.page_token = response.page_token;
        self.absorb_schema(response.schema.and_then(|s| s.fields));

        let rows = response.rows.unwrap_or_default();
        tracing::debug!(job_id, rows = rows.len(), complete = self.job_complete, "fetched result page");
        self.buffer.extend(rows);
        Ok(())
    }

    fn decode(&self, row: TableRow) -> Row {
        let fallback = FieldDescriptor::new("", "STRING");
        row.columns
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, cell)| {
                let field = self
                    .fields
                    .as_ref()
                    .and_then(|fields| fields.get(i))
                    .unwrap_or(&fallback);
                match cell.value {
                    Some(raw) => decode_cell(&raw, field),
                    None => Value::Null,
                }
            })
            .collect()
    }
}

#[cfg(feature = "bigquery")]
#[async_trait::async_trait]
impl RowStream for BigQueryRowStream {
    async fn next(&mut self) -> Result<Option<Row>, WarehouseError> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(self.decode(row)));
            }
            if self.job_complete && self.page_token.is_none() {
                return Ok(None);
            }
            // An incomplete job keeps being polled until it reports completion
            let job_id = job_to_poll(self.job_id.as_deref())?.to_string();
            self.fetch_page(&job_id).await?;
        }
    }

    fn schema(&self) -> Option<&[String]> {
        self.names.as_deref()
    }
}

/// More results are pending, so the response must name the job to poll
#[cfg(feature = "bigquery")]
fn job_to_poll(job_id: Option<&str>) -> Result<&str, WarehouseError> {
    job_id.ok_or_else(|| {
        WarehouseError::InvalidResponse(
            "query results are incomplete but the response has no job reference".to_string(),
        )
    })
}

/// Buffered page state shared by the catalog listings
#[cfg(feature = "bigquery")]
#[derive(Default)]
struct PageCursor {
    buffer: VecDeque<String>,
    next_token: Option<String>,
    started: bool,
}

#[cfg(feature = "bigquery")]
impl PageCursor {
    fn has_more_pages(&self) -> bool {
        !self.started || self.next_token.is_some()
    }

    fn absorb(&mut self, names: impl IntoIterator<Item = String>, next_token: Option<String>) {
        self.started = true;
        self.buffer.extend(names);
        self.next_token = next_token;
    }
}

#[cfg(feature = "bigquery")]
struct DatasetNames {
    client: Arc<BigQueryClient>,
    project_id: String,
    pages: PageCursor,
}

#[cfg(feature = "bigquery")]
#[async_trait::async_trait]
impl NameStream for DatasetNames {
    async fn next(&mut self) -> Result<Option<String>, WarehouseError> {
        use gcp_bigquery_client::dataset::ListOptions;

        while self.pages.buffer.is_empty() && self.pages.has_more_pages() {
            let mut options = ListOptions::default().max_results(LIST_PAGE_SIZE);
            if let Some(token) = self.pages.next_token.clone() {
                options = options.page_token(token);
            }
            let page = self
                .client
                .dataset()
                .list(&self.project_id, options)
                .await
                .map_err(|e| WarehouseError::classify(e.to_string()))?;

            let names = page
                .datasets
                .into_iter()
                .map(|d| d.dataset_reference.dataset_id);
            self.pages.absorb(names, page.next_page_token);
        }
        Ok(self.pages.buffer.pop_front())
    }
}

#[cfg(feature = "bigquery")]
struct TableNames {
    client: Arc<BigQueryClient>,
    project_id: String,
    dataset_id: String,
    pages: PageCursor,
}

#[cfg(feature = "bigquery")]
#[async_trait::async_trait]
impl NameStream for TableNames {
    async fn next(&mut self) -> Result<Option<String>, WarehouseError> {
        use gcp_bigquery_client::table::ListOptions;

        while self.pages.buffer.is_empty() && self.pages.has_more_pages() {
            let mut options = ListOptions::default().max_results(LIST_PAGE_SIZE);
            if let Some(token) = self.pages.next_token.clone() {
                options = options.page_token(token);
            }
            let page = self
                .client
                .table()
                .list(&self.project_id, &self.dataset_id, options)
                .await
                .map_err(|e| WarehouseError::classify(e.to_string()))?;

            let names = page
                .tables
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.table_reference.table_id);
            self.pages.absorb(names, page.next_page_token);
        }
        Ok(self.pages.buffer.pop_front())
    }
}
