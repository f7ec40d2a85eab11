//! Warehouse backends for gbq-analyzer
//!
//! This crate defines the seam between the exploration logic and the data
//! warehouse: opening project-scoped connections, streaming query rows and
//! enumerating datasets and tables.
//!
//! ## Features
//!
//! Enable warehouse support via Cargo features:
//! - `bigquery` - Google BigQuery support
//!
//! Without the feature, [`BigQueryWarehouse::connect`](Warehouse::connect)
//! returns a configuration error. [`MockWarehouse`] is always available.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gbq_catalog::{BigQueryWarehouse, Warehouse};
//! use gbq_core::ProjectId;
//!
//! let warehouse = BigQueryWarehouse::with_adc();
//! let conn = warehouse.connect(&ProjectId::new("my-project")?).await?;
//! let mut datasets = conn.datasets().await?;
//! while let Some(id) = datasets.next().await? {
//!     println!("{}", id);
//! }
//! ```

pub mod adapter;
pub mod bigquery;
pub mod mock;

pub use adapter::{Connection, NameStream, RowStream, Warehouse, WarehouseError};
pub use bigquery::{BigQueryWarehouse, Credentials};
pub use mock::{MockConnection, MockQuery, MockWarehouse, MockWarehouseBuilder};
