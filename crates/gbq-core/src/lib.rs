//! gbq-analyzer core
//!
//! Domain types shared by every layer: project/dataset/table references,
//! table metadata, the scalar value model used for query results, and the
//! `gbq.toml` configuration.

pub mod config;
pub mod reference;
pub mod metadata;
pub mod value;

pub use config::{Config, ConfigError, DEFAULT_QUERY_LIMIT, DEFAULT_SAMPLE_ROWS, PROJECT_ENV};
pub use reference::{
    ArgumentError, DatasetRef, ProjectId, Scope, TableRef, PUBLIC_DATA_MARKER, PUBLIC_DATA_PROJECT,
};
pub use metadata::{FieldDescriptor, FieldMode, TableMetadata};
pub use value::{decode_cell, format_value, Row, Value, NULL_PLACEHOLDER};
