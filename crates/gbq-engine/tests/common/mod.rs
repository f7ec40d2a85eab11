//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use gbq_catalog::{MockWarehouse, MockWarehouseBuilder};
use gbq_core::{FieldDescriptor, ProjectId, TableMetadata};
use gbq_engine::{Session, TableRenderer};
use std::io::{self, Write};
use std::sync::Arc;

pub const PUBLIC: &str = "bigquery-public-data";
pub const PRIVATE: &str = "my-proj";

/// Renderer that records what it was given and writes rows as `a | b`
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub headers: Vec<String>,
    pub header_calls: usize,
    pub rows: Vec<Vec<String>>,
    pub renders: usize,
}

impl TableRenderer for RecordingRenderer {
    fn set_headers(&mut self, headers: Vec<String>) {
        self.headers = headers;
        self.header_calls += 1;
    }

    fn append_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.renders += 1;
        writeln!(out, "{}", self.headers.join(" | "))?;
        for row in &self.rows {
            writeln!(out, "{}", row.join(" | "))?;
        }
        Ok(())
    }
}

pub fn project(id: &str) -> ProjectId {
    ProjectId::new(id).unwrap()
}

pub async fn open(warehouse: &MockWarehouse, project_id: &str) -> Session {
    Session::open(Arc::new(warehouse.clone()), project(project_id))
        .await
        .unwrap()
}

pub fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

/// `n` public dataset ids named `ds_01..`
pub fn numbered_datasets(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("ds_{:02}", i)).collect()
}

pub fn orders_metadata() -> TableMetadata {
    TableMetadata::new(
        1_000_000,
        52_428_800,
        vec![FieldDescriptor::new("id", "INTEGER")],
    )
}

pub fn shakespeare_metadata() -> TableMetadata {
    TableMetadata::new(
        164_656,
        6_432_064,
        vec![
            FieldDescriptor::new("word", "STRING").with_description("A single unique word"),
            FieldDescriptor::new("word_count", "INTEGER"),
        ],
    )
    .with_description("Word index for works of Shakespeare")
}

/// Public samples catalog plus a private `sales` dataset
pub fn catalog() -> MockWarehouseBuilder {
    MockWarehouseBuilder::new()
        .with_datasets(PUBLIC, ["samples", "usa_names"])
        .with_datasets(PUBLIC, ["samples_empty"])
        .with_table(PUBLIC, "samples", "shakespeare", shakespeare_metadata())
        .with_tables(PUBLIC, "samples", ["natality"])
        .with_datasets(PRIVATE, ["sales", "marketing"])
        .with_table(PRIVATE, "sales", "orders", orders_metadata())
}
