//! Table profiling queries
//!
//! A profile is one aggregate query over the table: the total row count, and
//! for every column that supports it, its NULL count and distinct count. The
//! single wide result row is turned back into one line per column.

use crate::error::{until_cancelled, ExploreError, Result};
use crate::render::TableRenderer;
use gbq_catalog::Connection;
use gbq_core::{format_value, FieldDescriptor, TableMetadata, Value};
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Types that cannot be grouped or counted distinctly
const UNPROFILABLE_TYPES: &[&str] = &["RECORD", "STRUCT", "JSON", "GEOGRAPHY", "ARRAY", "RANGE"];

/// `SELECT * FROM path LIMIT rows`
pub fn sample_query(table_path: &str, rows: i64) -> String {
    format!("SELECT * FROM `{}` LIMIT {}", table_path, rows.max(0))
}

pub fn is_profilable(field: &FieldDescriptor) -> bool {
    !field.is_repeated() && !UNPROFILABLE_TYPES.contains(&field.base_type().as_str())
}

/// Build the aggregate profile SQL, or `None` if no column can be profiled
pub fn profile_query(table_path: &str, metadata: &TableMetadata) -> Option<String> {
    let columns: Vec<&FieldDescriptor> = metadata.schema.iter().filter(|f| is_profilable(f)).collect();
    if columns.is_empty() {
        return None;
    }

    let mut select = vec!["COUNT(*) AS total_rows".to_string()];
    for (i, field) in columns.iter().enumerate() {
        select.push(format!("COUNTIF(`{}` IS NULL) AS c{}_nulls", field.name, i));
        select.push(format!("COUNT(DISTINCT `{}`) AS c{}_distinct", field.name, i));
    }

    Some(format!(
        "SELECT {} FROM `{}`",
        select.join(", "),
        table_path
    ))
}

/// Per-column result of a profile query
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub field_type: String,
    pub nulls: Value,
    pub distinct: Value,
}

/// Result of a profile query
#[derive(Debug, Clone, PartialEq)]
pub struct TableProfile {
    pub total_rows: Value,
    pub columns: Vec<ColumnProfile>,
}

impl TableProfile {
    /// Split the wide profile row back into per-column entries
    pub fn from_row(metadata: &TableMetadata, row: &[Value]) -> Self {
        let cell = |i: usize| row.get(i).cloned().unwrap_or(Value::Null);

        let columns = metadata
            .schema
            .iter()
            .filter(|f| is_profilable(f))
            .enumerate()
            .map(|(i, field)| ColumnProfile {
                name: field.name.clone(),
                field_type: field.field_type.clone(),
                nulls: cell(1 + 2 * i),
                distinct: cell(2 + 2 * i),
            })
            .collect();

        Self {
            total_rows: cell(0),
            columns,
        }
    }

    /// Render one line per column, followed by the total row count
    pub fn render(&self, renderer: &mut dyn TableRenderer, out: &mut dyn Write) -> Result<()> {
        renderer.set_headers(
            ["column", "type", "nulls", "distinct"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        );
        for column in &self.columns {
            renderer.append_row(vec![
                column.name.clone(),
                column.field_type.clone(),
                format_value(&column.nulls),
                format_value(&column.distinct),
            ]);
        }
        renderer.render(out)?;
        writeln!(out)?;
        writeln!(out, "Total rows: {}", format_value(&self.total_rows))?;
        Ok(())
    }
}

/// Run the profile query for a table
pub async fn profile_table(
    connection: &dyn Connection,
    cancel: &CancellationToken,
    table_path: &str,
    metadata: &TableMetadata,
) -> Result<Option<TableProfile>> {
    let Some(sql) = profile_query(table_path, metadata) else {
        return Ok(None);
    };
    tracing::debug!(%sql, "profiling table");

    until_cancelled(cancel, async {
        let mut stream = connection.query(&sql).await.map_err(ExploreError::Query)?;
        let row = stream
            .next()
            .await
            .map_err(|source| ExploreError::Read { rows: 0, source })?
            .unwrap_or_default();
        Ok(Some(TableProfile::from_row(metadata, &row)))
    })
    .await
}
