//! Row-limited query execution
//!
//! Rows are pulled one at a time from the warehouse and stop at whichever
//! comes first: the end of results or `limit` rows. Headers come from the
//! first row only, using the stream's schema when it has one and positional
//! `Column_N` names otherwise.

use crate::error::{ExploreError, Result};
use crate::render::TableRenderer;
use gbq_catalog::{Connection, RowStream};
use gbq_core::{format_value, Row};
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a single execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    NotStarted,
    Streaming,
    /// The source ran out of rows before the limit
    Exhausted,
    /// `limit` rows were consumed
    LimitReached,
    Rendered,
}

/// What an execution produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub rows_returned: usize,

    /// Empty when no row was consumed
    pub headers: Vec<String>,

    /// `Exhausted` or `LimitReached`
    pub stopped: ExecutionState,
}

/// Runs one SQL statement and renders up to `limit` rows
///
/// Single use: `execute` consumes the executor.
pub struct QueryExecutor<'a> {
    connection: &'a dyn Connection,
    cancel: CancellationToken,
    state: ExecutionState,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(connection: &'a dyn Connection, cancel: CancellationToken) -> Self {
        Self {
            connection,
            cancel,
            state: ExecutionState::NotStarted,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Submit `sql`, stream up to `limit` rows into `renderer`, then write the
    /// table and a row-count summary to `out`
    ///
    /// A `limit` of zero or less consumes no rows. An empty result prints
    /// `No results found.` and succeeds. If the stream fails part way, the
    /// rows already read are still rendered before the error is returned.
    pub async fn execute(
        mut self,
        sql: &str,
        limit: i64,
        renderer: &mut dyn TableRenderer,
        out: &mut dyn Write,
    ) -> Result<QueryOutcome> {
        let mut stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ExploreError::Cancelled),
            submitted = self.connection.query(sql) => submitted.map_err(ExploreError::Query)?,
        };
        self.transition(ExecutionState::Streaming);

        let limit = usize::try_from(limit).unwrap_or(0);
        let mut headers: Option<Vec<String>> = None;
        let mut rows = 0usize;
        let mut arity_warned = false;
        let mut read_error = None;

        while rows < limit {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ExploreError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Ok(Some(row)) => {
                    let width = match &headers {
                        Some(h) => h.len(),
                        None => {
                            let inferred = infer_headers(stream.as_ref(), row.len());
                            renderer.set_headers(inferred.clone());
                            let width = inferred.len();
                            headers = Some(inferred);
                            width
                        }
                    };

                    if row.len() != width && !arity_warned {
                        tracing::warn!(
                            expected = width,
                            actual = row.len(),
                            "row width differs from header; padding/truncating"
                        );
                        arity_warned = true;
                    }

                    renderer.append_row(format_row(row, width));
                    rows += 1;
                }
                Ok(None) => {
                    self.transition(ExecutionState::Exhausted);
                    break;
                }
                Err(source) => {
                    read_error = Some(source);
                    break;
                }
            }
        }

        if self.state == ExecutionState::Streaming {
            if read_error.is_none() {
                tracing::debug!(limit, "row limit reached");
            }
            self.transition(if read_error.is_some() {
                ExecutionState::Exhausted
            } else {
                ExecutionState::LimitReached
            });
        }
        let stopped = self.state;

        if rows == 0 {
            if let Some(source) = read_error {
                return Err(ExploreError::Read { rows, source });
            }
            writeln!(out, "No results found.")?;
            return Ok(QueryOutcome {
                rows_returned: 0,
                headers: Vec::new(),
                stopped,
            });
        }

        renderer.render(out)?;
        writeln!(out)?;
        writeln!(out, "Rows returned: {}", rows)?;
        self.transition(ExecutionState::Rendered);

        if let Some(source) = read_error {
            tracing::warn!(rows, error = %source, "result stream failed; partial results shown");
            writeln!(out, "Warning: result stream failed after {} rows", rows)?;
            return Err(ExploreError::Read { rows, source });
        }

        Ok(QueryOutcome {
            rows_returned: rows,
            headers: headers.unwrap_or_default(),
            stopped,
        })
    }

    fn transition(&mut self, next: ExecutionState) {
        tracing::trace!(from = ?self.state, to = ?next, "query state");
        self.state = next;
    }
}

/// Schema names when the stream has them, else `Column_1..Column_N`
fn infer_headers(stream: &dyn RowStream, arity: usize) -> Vec<String> {
    match stream.schema() {
        Some(names) if !names.is_empty() => names.to_vec(),
        _ => (1..=arity).map(|i| format!("Column_{}", i)).collect(),
    }
}

/// Stringify a row, padding with empty cells or truncating to `width`
fn format_row(row: Row, width: usize) -> Vec<String> {
    let mut cells: Vec<String> = row.iter().take(width).map(format_value).collect();
    cells.resize(width, String::new());
    cells
}
