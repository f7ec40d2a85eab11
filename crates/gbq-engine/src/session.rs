//! One command invocation against the warehouse
//!
//! A session owns the primary connection to the active project for its whole
//! lifetime and hands out the resolver, browser and executor that borrow it.

use crate::analyze::{profile_table, sample_query};
use crate::browser::CatalogBrowser;
use crate::error::{until_cancelled, ExploreError, Result};
use crate::executor::{QueryExecutor, QueryOutcome};
use crate::render::TableRenderer;
use crate::resolver::ReferenceResolver;
use gbq_catalog::{Connection, Warehouse, WarehouseError};
use gbq_core::{
    ArgumentError, DatasetRef, ProjectId, TableMetadata, TableRef, Value, PROJECT_ENV,
    PUBLIC_DATA_MARKER,
};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// SQL used to check that the warehouse answers queries
pub const TEST_QUERY: &str = "SELECT 1 as test_value";

/// What `explore` should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExploreRequest {
    PublicDatasets,
    PrivateDatasets,
    Tables { dataset: String },
    Describe { dataset: String, table: String },
}

impl ExploreRequest {
    /// Map `explore [dataset] [table]` onto a request
    ///
    /// Without a project of one's own the public catalog is explored and the
    /// `bigquery-public-data.` prefix is added to bare dataset names.
    pub fn from_args(private: bool, args: &[String]) -> std::result::Result<Self, ArgumentError> {
        let dataset = |raw: &str| {
            if private || raw.starts_with(PUBLIC_DATA_MARKER) {
                raw.to_string()
            } else {
                format!("{}{}", PUBLIC_DATA_MARKER, raw)
            }
        };

        match args {
            [] if private => Ok(Self::PrivateDatasets),
            [] => Ok(Self::PublicDatasets),
            [ds] => Ok(Self::Tables { dataset: dataset(ds) }),
            [ds, table] => Ok(Self::Describe {
                dataset: dataset(ds),
                table: table.clone(),
            }),
            _ => Err(ArgumentError::TooManyArguments {
                max: 2,
                got: args.len(),
            }),
        }
    }
}

/// Owns the primary connection for one invocation
pub struct Session {
    warehouse: Arc<dyn Warehouse>,
    primary: Box<dyn Connection>,
    cancel: CancellationToken,
}

impl Session {
    /// Connect to `project`
    pub async fn open(warehouse: Arc<dyn Warehouse>, project: ProjectId) -> Result<Self> {
        let primary = warehouse
            .connect(&project)
            .await
            .map_err(|source| ExploreError::Connection {
                project: project.to_string(),
                source,
            })?;

        tracing::debug!(project = %project, warehouse = warehouse.name(), "session opened");

        Ok(Self {
            warehouse,
            primary,
            cancel: CancellationToken::new(),
        })
    }

    pub fn project(&self) -> &ProjectId {
        self.primary.project()
    }

    /// Token that aborts whatever operation is in flight
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(
            self.warehouse.as_ref(),
            self.primary.as_ref(),
            self.cancel.clone(),
        )
    }

    pub fn browser(&self) -> CatalogBrowser<'_> {
        CatalogBrowser::new(self.resolver(), self.primary.as_ref(), self.cancel.clone())
    }

    pub fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(self.primary.as_ref(), self.cancel.clone())
    }

    /// Run SQL on the primary connection and render up to `limit` rows
    pub async fn query(
        &self,
        sql: &str,
        limit: i64,
        renderer: &mut dyn TableRenderer,
        out: &mut dyn Write,
    ) -> Result<QueryOutcome> {
        self.executor().execute(sql, limit, renderer, out).await
    }

    /// Dispatch an explore request; `sample_rows` adds sample rows to a describe
    pub async fn explore(
        &self,
        request: &ExploreRequest,
        sample_rows: Option<i64>,
        renderer: &mut dyn TableRenderer,
        out: &mut dyn Write,
    ) -> Result<()> {
        let browser = self.browser();
        match request {
            ExploreRequest::PublicDatasets => {
                browser.list_public_datasets(out).await?;
            }
            ExploreRequest::PrivateDatasets => {
                browser.list_private_datasets(out).await?;
            }
            ExploreRequest::Tables { dataset } => {
                browser.list_tables(dataset, out).await?;
            }
            ExploreRequest::Describe { dataset, table } => {
                if sample_rows.is_some() {
                    self.require_billing_project("--sample")?;
                }
                browser.describe_table(dataset, table, out).await?;
                if let Some(rows) = sample_rows {
                    let table = TableRef::new(DatasetRef::parse(dataset)?, table.as_str());
                    self.sample(&table, rows, renderer, out).await?;
                }
            }
        }
        Ok(())
    }

    /// Run the connection test query and print its single value
    pub async fn test_connection(&self, out: &mut dyn Write) -> Result<Value> {
        let value = until_cancelled(&self.cancel, async {
            let mut stream = self
                .primary
                .query(TEST_QUERY)
                .await
                .map_err(ExploreError::Query)?;
            let row = stream
                .next()
                .await
                .map_err(|source| ExploreError::Read { rows: 0, source })?;
            row.and_then(|r| r.into_iter().next())
                .ok_or_else(|| ExploreError::Read {
                    rows: 0,
                    source: WarehouseError::InvalidResponse(
                        "test query returned no rows".to_string(),
                    ),
                })
        })
        .await?;

        writeln!(out, "BigQuery connection successful! Test result: {}", value)?;
        Ok(value)
    }

    /// Describe a `dataset.table` reference, optionally sample it, then profile it
    pub async fn analyze(
        &self,
        raw_table: &str,
        sample_rows: Option<i64>,
        renderer: &mut dyn TableRenderer,
        out: &mut dyn Write,
    ) -> Result<TableMetadata> {
        let table = TableRef::parse(raw_table)?;
        self.require_billing_project("analyze")?;
        let metadata = self
            .browser()
            .describe_table(&table.dataset.qualified(), &table.table_id, out)
            .await?;

        if let Some(rows) = sample_rows {
            self.sample(&table, rows, renderer, out).await?;
        }

        let path = table.sql_path(self.project());
        writeln!(out)?;
        writeln!(out, "Profile")?;
        match profile_table(self.primary.as_ref(), &self.cancel, &path, &metadata).await? {
            Some(profile) => profile.render(renderer, out)?,
            None => writeln!(out, "No columns can be profiled")?,
        }

        Ok(metadata)
    }

    async fn sample(
        &self,
        table: &TableRef,
        rows: i64,
        renderer: &mut dyn TableRenderer,
        out: &mut dyn Write,
    ) -> Result<QueryOutcome> {
        let sql = sample_query(&table.sql_path(self.project()), rows);
        writeln!(out)?;
        writeln!(out, "Sample rows")?;
        self.executor().execute(&sql, rows, renderer, out).await
    }

    /// Queries are billed to the session project, and nobody may run jobs in
    /// the public-data project itself
    fn require_billing_project(&self, what: &str) -> Result<()> {
        if self.project().is_public_data() {
            return Err(ArgumentError::Missing(format!(
                "{} runs a query and needs a project of your own: pass --project or set {}",
                what, PROJECT_ENV
            ))
            .into());
        }
        Ok(())
    }

    /// Release the primary connection
    pub fn close(self) {
        tracing::debug!(project = %self.primary.project(), "session closed");
    }
}
