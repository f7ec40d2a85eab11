//! Project, dataset and table references
//!
//! A dataset id written with the `bigquery-public-data.` prefix lives in the
//! shared public catalog; everything else belongs to the caller's project.
//! Classification never touches the network.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Project hosting the shared public catalog
pub const PUBLIC_DATA_PROJECT: &str = "bigquery-public-data";

/// Prefix marking a dataset id as part of the public catalog
pub const PUBLIC_DATA_MARKER: &str = "bigquery-public-data.";

/// Malformed reference or argument supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("project ID must not be empty")]
    EmptyProject,

    #[error("dataset ID must not be empty")]
    EmptyDataset,

    #[error("invalid table reference '{0}': use format dataset.table or bigquery-public-data.dataset.table")]
    MissingTable(String),

    #[error("invalid table reference '{0}': empty segment")]
    EmptySegment(String),

    #[error("too many arguments: expected at most {max}, got {got}")]
    TooManyArguments { max: usize, got: usize },

    #[error("{0}")]
    Missing(String),
}

/// Billing/connection scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a project id, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, ArgumentError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ArgumentError::EmptyProject);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The sentinel project used when exploring without a project of one's own
    pub fn public_data() -> Self {
        Self(PUBLIC_DATA_PROJECT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_public_data(&self) -> bool {
        self.0 == PUBLIC_DATA_PROJECT
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which catalog a dataset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Shared public catalog (`bigquery-public-data`)
    Public,

    /// The caller's active project
    Private,
}

/// A scope-tagged dataset identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    pub scope: Scope,

    /// Dataset id inside its project (public marker already stripped)
    pub id: String,
}

impl DatasetRef {
    /// Classify a raw dataset id by its prefix
    ///
    /// The public marker is stripped exactly once, so
    /// `bigquery-public-data.bigquery-public-data.x` keeps one copy in the id.
    pub fn parse(raw: &str) -> Result<Self, ArgumentError> {
        let dataset = match raw.strip_prefix(PUBLIC_DATA_MARKER) {
            Some(rest) => Self::public(rest),
            None => Self::private(raw),
        };
        if dataset.id.is_empty() {
            return Err(ArgumentError::EmptyDataset);
        }
        Ok(dataset)
    }

    pub fn public(id: impl Into<String>) -> Self {
        Self {
            scope: Scope::Public,
            id: id.into(),
        }
    }

    pub fn private(id: impl Into<String>) -> Self {
        Self {
            scope: Scope::Private,
            id: id.into(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.scope == Scope::Public
    }

    /// Dataset id as the user would write it (public marker restored)
    pub fn qualified(&self) -> String {
        match self.scope {
            Scope::Public => format!("{}{}", PUBLIC_DATA_MARKER, self.id),
            Scope::Private => self.id.clone(),
        }
    }

    /// Project that hosts this dataset, given the caller's active project
    pub fn host_project<'a>(&self, active: &'a ProjectId) -> std::borrow::Cow<'a, str> {
        match self.scope {
            Scope::Public => std::borrow::Cow::Borrowed(PUBLIC_DATA_PROJECT),
            Scope::Private => std::borrow::Cow::Borrowed(active.as_str()),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// A table inside a scope-tagged dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub dataset: DatasetRef,
    pub table_id: String,
}

impl TableRef {
    pub fn new(dataset: DatasetRef, table_id: impl Into<String>) -> Self {
        Self {
            dataset,
            table_id: table_id.into(),
        }
    }

    /// Parse `dataset.table`, or `a.b.….table` where everything before the
    /// last dot is the dataset id
    pub fn parse(raw: &str) -> Result<Self, ArgumentError> {
        let (dataset, table) = raw
            .rsplit_once('.')
            .ok_or_else(|| ArgumentError::MissingTable(raw.to_string()))?;

        if table.is_empty() || dataset.split('.').any(str::is_empty) {
            return Err(ArgumentError::EmptySegment(raw.to_string()));
        }

        Ok(Self::new(DatasetRef::parse(dataset)?, table))
    }

    /// Fully qualified `project.dataset.table` path for use in SQL
    pub fn sql_path(&self, active: &ProjectId) -> String {
        format!(
            "{}.{}.{}",
            self.dataset.host_project(active),
            self.dataset.id,
            self.table_id
        )
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_rejects_blank() {
        assert_eq!(ProjectId::new("  "), Err(ArgumentError::EmptyProject));
        assert_eq!(ProjectId::new(" my-proj ").unwrap().as_str(), "my-proj");
        assert!(ProjectId::public_data().is_public_data());
    }

    #[test]
    fn public_marker_is_stripped_once() {
        let ds = DatasetRef::parse("bigquery-public-data.samples").unwrap();
        assert_eq!(ds.scope, Scope::Public);
        assert_eq!(ds.id, "samples");

        let ds = DatasetRef::parse("bigquery-public-data.bigquery-public-data.x").unwrap();
        assert_eq!(ds.scope, Scope::Public);
        assert_eq!(ds.id, "bigquery-public-data.x");
    }

    #[test]
    fn unprefixed_dataset_is_private() {
        let ds = DatasetRef::parse("analytics").unwrap();
        assert_eq!(ds, DatasetRef::private("analytics"));

        // The bare project name without the trailing dot is not the marker
        let ds = DatasetRef::parse("bigquery-public-data").unwrap();
        assert_eq!(ds.scope, Scope::Private);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert_eq!(DatasetRef::parse(""), Err(ArgumentError::EmptyDataset));
        assert_eq!(
            DatasetRef::parse("bigquery-public-data."),
            Err(ArgumentError::EmptyDataset)
        );
    }

    #[test]
    fn qualified_restores_marker() {
        assert_eq!(DatasetRef::public("samples").qualified(), "bigquery-public-data.samples");
        assert_eq!(DatasetRef::private("sales").qualified(), "sales");
    }

    #[test]
    fn parse_two_part_reference() {
        let table = TableRef::parse("ds.tbl").unwrap();
        assert_eq!(table.dataset.id, "ds");
        assert_eq!(table.table_id, "tbl");
    }

    #[test]
    fn parse_multi_part_reference_joins_dataset() {
        let table = TableRef::parse("a.b.tbl").unwrap();
        assert_eq!(table.dataset.id, "a.b");
        assert_eq!(table.table_id, "tbl");

        let table = TableRef::parse("bigquery-public-data.samples.shakespeare").unwrap();
        assert_eq!(table.dataset, DatasetRef::public("samples"));
        assert_eq!(table.table_id, "shakespeare");
    }

    #[test]
    fn parse_rejects_single_segment() {
        assert_eq!(
            TableRef::parse("nodot"),
            Err(ArgumentError::MissingTable("nodot".to_string()))
        );
    }

    #[test]
    fn missing_table_message_shows_accepted_forms() {
        let message = ArgumentError::MissingTable("nodot".to_string()).to_string();
        assert_eq!(
            message,
            "invalid table reference 'nodot': use format dataset.table or bigquery-public-data.dataset.table"
        );
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(matches!(TableRef::parse("ds."), Err(ArgumentError::EmptySegment(_))));
        assert!(matches!(TableRef::parse(".tbl"), Err(ArgumentError::EmptySegment(_))));
        assert!(matches!(TableRef::parse("a..tbl"), Err(ArgumentError::EmptySegment(_))));
    }

    #[test]
    fn sql_path_uses_host_project() {
        let active = ProjectId::new("my-proj").unwrap();

        let public = TableRef::parse("bigquery-public-data.samples.shakespeare").unwrap();
        assert_eq!(public.sql_path(&active), "bigquery-public-data.samples.shakespeare");

        let private = TableRef::parse("sales.orders").unwrap();
        assert_eq!(private.sql_path(&active), "my-proj.sales.orders");
        assert_eq!(private.to_string(), "sales.orders");
    }
}
