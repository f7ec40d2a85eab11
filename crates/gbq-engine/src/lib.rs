//! gbq-analyzer engine
//!
//! Exploration and ad-hoc query logic on top of a [`gbq_catalog::Warehouse`]:
//! - Public/private dataset resolution with scoped secondary connections
//! - Catalog browsing (datasets, tables, table descriptions)
//! - Streaming, row-limited query execution with header inference
//! - Table profiling
//!
//! Nothing here reads flags, environment or process state; output goes to a
//! caller-supplied writer.

pub mod analyze;
pub mod browser;
pub mod error;
pub mod executor;
pub mod render;
pub mod resolver;
pub mod session;

pub use analyze::{profile_query, sample_query, ColumnProfile, TableProfile};
pub use browser::{CatalogBrowser, PUBLIC_LISTING_CAP};
pub use error::{ExploreError, Result};
pub use executor::{ExecutionState, QueryExecutor, QueryOutcome};
pub use render::{TableRenderer, TabledRenderer};
pub use resolver::{ConnectionHandle, ReferenceResolver, ResolvedDataset};
pub use session::{ExploreRequest, Session, TEST_QUERY};
