//! Public/private dataset resolution
//!
//! A dataset in the public catalog is reached through its own short-lived
//! connection to `bigquery-public-data`; a private dataset reuses the
//! session's primary connection. The secondary connection is owned by the
//! returned handle and released when the handle is dropped, whichever way
//! the operation using it ends.

use crate::error::{until_cancelled, ExploreError, Result};
use gbq_catalog::{Connection, Warehouse};
use gbq_core::{DatasetRef, ProjectId, Scope};
use tokio_util::sync::CancellationToken;

/// Connection used for one catalog operation
pub enum ConnectionHandle<'a> {
    /// The session's primary connection; release is a no-op
    Primary(&'a dyn Connection),

    /// A connection opened for this operation only
    Scoped(Box<dyn Connection>),
}

impl ConnectionHandle<'_> {
    pub fn connection(&self) -> &dyn Connection {
        match self {
            Self::Primary(conn) => *conn,
            Self::Scoped(conn) => conn.as_ref(),
        }
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, Self::Scoped(_))
    }
}

impl Drop for ConnectionHandle<'_> {
    fn drop(&mut self) {
        if let Self::Scoped(conn) = self {
            tracing::debug!(project = %conn.project(), "releasing scoped connection");
        }
    }
}

/// A classified dataset together with the connection that reaches it
pub struct ResolvedDataset<'a> {
    pub dataset: DatasetRef,
    handle: ConnectionHandle<'a>,
}

impl<'a> ResolvedDataset<'a> {
    pub fn connection(&self) -> &dyn Connection {
        self.handle.connection()
    }

    /// Whether a secondary connection was opened for this dataset
    pub fn is_scoped(&self) -> bool {
        self.handle.is_scoped()
    }
}

/// Classifies dataset ids and hands out the matching connection
pub struct ReferenceResolver<'a> {
    warehouse: &'a dyn Warehouse,
    primary: &'a dyn Connection,
    cancel: CancellationToken,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(
        warehouse: &'a dyn Warehouse,
        primary: &'a dyn Connection,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            warehouse,
            primary,
            cancel,
        }
    }

    /// Resolve a raw dataset id such as `sales` or `bigquery-public-data.samples`
    pub async fn resolve(&self, raw_dataset_id: &str) -> Result<ResolvedDataset<'a>> {
        let dataset = DatasetRef::parse(raw_dataset_id)?;

        let handle = match dataset.scope {
            Scope::Public => self.public_connection().await?,
            Scope::Private => ConnectionHandle::Primary(self.primary),
        };

        tracing::debug!(
            raw = raw_dataset_id,
            scope = ?dataset.scope,
            id = %dataset.id,
            "resolved dataset"
        );

        Ok(ResolvedDataset { dataset, handle })
    }

    /// Open a connection scoped to the public-data project
    pub async fn public_connection(&self) -> Result<ConnectionHandle<'a>> {
        let project = ProjectId::public_data();
        let conn = until_cancelled(&self.cancel, async {
            self.warehouse
                .connect(&project)
                .await
                .map_err(|source| ExploreError::Connection {
                    project: project.to_string(),
                    source,
                })
        })
        .await?;

        tracing::debug!(project = %project, "opened scoped connection");
        Ok(ConnectionHandle::Scoped(conn))
    }
}
