//! Catalog browsing: datasets, tables and table descriptions
//!
//! Listings are written in the order the warehouse enumerates them.

use crate::error::{until_cancelled, ExploreError, Result};
use crate::resolver::ReferenceResolver;
use gbq_catalog::{Connection, NameStream, WarehouseError};
use gbq_core::{TableMetadata, TableRef, PUBLIC_DATA_MARKER};
use std::future::Future;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Most public datasets printed by [`CatalogBrowser::list_public_datasets`]
pub const PUBLIC_LISTING_CAP: usize = 20;

/// Read-only catalog operations
pub struct CatalogBrowser<'a> {
    resolver: ReferenceResolver<'a>,
    primary: &'a dyn Connection,
    cancel: CancellationToken,
}

impl<'a> CatalogBrowser<'a> {
    pub fn new(
        resolver: ReferenceResolver<'a>,
        primary: &'a dyn Connection,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            resolver,
            primary,
            cancel,
        }
    }

    /// List the public catalog, stopping after [`PUBLIC_LISTING_CAP`] entries
    ///
    /// Returns the number of datasets printed.
    pub async fn list_public_datasets(&self, out: &mut dyn Write) -> Result<usize> {
        let handle = self.resolver.public_connection().await?;
        let what = "public datasets";

        writeln!(out, "=== Available Public Datasets ===")?;

        let mut datasets = self.open_listing(handle.connection().datasets(), what).await?;
        let mut shown = 0;
        while let Some(id) = self.pull(&mut datasets, what).await? {
            // One look-ahead pull tells "exactly 20" apart from "more than 20"
            if shown == PUBLIC_LISTING_CAP {
                writeln!(
                    out,
                    "... (showing first {}, there are many more)",
                    PUBLIC_LISTING_CAP
                )?;
                break;
            }
            writeln!(out, "- {}{}", PUBLIC_DATA_MARKER, id)?;
            shown += 1;
        }

        Ok(shown)
    }

    /// List every dataset in the active project
    pub async fn list_private_datasets(&self, out: &mut dyn Write) -> Result<usize> {
        let what = format!("datasets in project {}", self.primary.project());

        writeln!(out, "=== Datasets in project: {} ===", self.primary.project())?;

        let mut datasets = self.open_listing(self.primary.datasets(), &what).await?;
        let mut count = 0;
        while let Some(id) = self.pull(&mut datasets, &what).await? {
            writeln!(out, "- {}", id)?;
            count += 1;
        }

        if count == 0 {
            writeln!(out, "No datasets found in this project")?;
        } else {
            writeln!(out)?;
            writeln!(out, "Total datasets: {}", count)?;
        }

        Ok(count)
    }

    /// List the tables of a dataset (public or private)
    pub async fn list_tables(&self, dataset_id: &str, out: &mut dyn Write) -> Result<usize> {
        let resolved = self.resolver.resolve(dataset_id).await?;
        let what = format!("tables in {}", dataset_id);

        writeln!(out, "Tables in dataset '{}':", dataset_id)?;

        let mut tables = self
            .open_listing(resolved.connection().tables(&resolved.dataset.id), &what)
            .await?;
        let mut count = 0;
        while let Some(id) = self.pull(&mut tables, &what).await? {
            writeln!(out, "- {}", id)?;
            count += 1;
        }

        if count == 0 {
            writeln!(out, "No tables found")?;
        }

        Ok(count)
    }

    /// Print description, size and schema of a table
    pub async fn describe_table(
        &self,
        dataset_id: &str,
        table_id: &str,
        out: &mut dyn Write,
    ) -> Result<TableMetadata> {
        let resolved = self.resolver.resolve(dataset_id).await?;
        let table = TableRef::new(resolved.dataset.clone(), table_id);

        let metadata = until_cancelled(&self.cancel, async {
            resolved
                .connection()
                .table_metadata(&table.dataset.id, &table.table_id)
                .await
                .map_err(|source| ExploreError::MetadataFetch {
                    table: table.to_string(),
                    source,
                })
        })
        .await?;

        writeln!(out)?;
        writeln!(out, "Table: {}", table)?;
        writeln!(out, "Description: {}", metadata.description)?;
        writeln!(out, "Rows: {}", metadata.row_count)?;
        writeln!(out, "Size: {} bytes", metadata.byte_size)?;

        writeln!(out)?;
        writeln!(out, "Schema")?;
        for field in &metadata.schema {
            writeln!(out, " {} ({}) - {}", field.name, field.field_type, field.description)?;
        }

        Ok(metadata)
    }

    async fn open_listing<F>(&self, listing: F, what: &str) -> Result<Box<dyn NameStream>>
    where
        F: Future<Output = std::result::Result<Box<dyn NameStream>, WarehouseError>>,
    {
        until_cancelled(&self.cancel, async {
            listing.await.map_err(|source| ExploreError::Listing {
                what: what.to_string(),
                source,
            })
        })
        .await
    }

    async fn pull(&self, stream: &mut Box<dyn NameStream>, what: &str) -> Result<Option<String>> {
        until_cancelled(&self.cancel, async {
            stream.next().await.map_err(|source| ExploreError::Listing {
                what: what.to_string(),
                source,
            })
        })
        .await
    }
}
