//! Errors surfaced by exploration and query operations

use gbq_catalog::WarehouseError;
use gbq_core::ArgumentError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Every error carries what was being attempted plus the warehouse cause
#[derive(Debug, thiserror::Error)]
pub enum ExploreError {
    #[error("failed to connect to project {project}: {source}")]
    Connection {
        project: String,
        source: WarehouseError,
    },

    #[error("query execute failed: {0}")]
    Query(#[source] WarehouseError),

    #[error("result stream failed after {rows} rows: {source}")]
    Read { rows: usize, source: WarehouseError },

    #[error("failed to get table metadata for {table}: {source}")]
    MetadataFetch {
        table: String,
        source: WarehouseError,
    },

    #[error("error listing {what}: {source}")]
    Listing { what: String, source: WarehouseError },

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExploreError>;

/// Run `fut` unless the session is cancelled first
pub(crate) async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExploreError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let err = ExploreError::Connection {
            project: "bigquery-public-data".to_string(),
            source: WarehouseError::NetworkError("timeout".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to connect to project bigquery-public-data: Network error: timeout"
        );

        let err = ExploreError::from(ArgumentError::MissingTable("x".to_string()));
        assert!(err.to_string().starts_with("invalid table reference 'x'"));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = until_cancelled(&cancel, async { Ok(1) }).await;
        assert!(matches!(result, Err(ExploreError::Cancelled)));
    }

    #[tokio::test]
    async fn live_token_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = until_cancelled(&cancel, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
