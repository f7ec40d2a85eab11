//! Test fixtures for warehouse integration tests
//!
//! Table metadata and catalogs shaped like the public BigQuery samples, so
//! tests read the way real exploration sessions do.

use gbq_core::{FieldDescriptor, FieldMode, TableMetadata};

pub const PUBLIC: &str = "bigquery-public-data";

/// `bigquery-public-data.samples.shakespeare`
pub fn shakespeare_metadata() -> TableMetadata {
    TableMetadata::new(
        164_656,
        6_432_064,
        vec![
            FieldDescriptor::new("word", "STRING")
                .with_mode(FieldMode::Required)
                .with_description("A single unique word (where whitespace is the delimiter) extracted from a corpus."),
            FieldDescriptor::new("word_count", "INTEGER")
                .with_mode(FieldMode::Required)
                .with_description("The number of times this word appears in this corpus."),
            FieldDescriptor::new("corpus", "STRING")
                .with_mode(FieldMode::Required)
                .with_description("The work from which this word was extracted."),
            FieldDescriptor::new("corpus_date", "INTEGER")
                .with_mode(FieldMode::Required)
                .with_description("The year in which this corpus was published."),
        ],
    )
    .with_description("Word index for works of Shakespeare")
}

/// A private events table with nested and repeated columns
pub fn events_metadata() -> TableMetadata {
    TableMetadata::new(
        1_000,
        64_000,
        vec![
            FieldDescriptor::new("event_id", "STRING").with_mode(FieldMode::Required),
            FieldDescriptor::new("tags", "STRING").with_mode(FieldMode::Repeated),
            FieldDescriptor::new("device", "RECORD").with_fields(vec![
                FieldDescriptor::new("os", "STRING"),
                FieldDescriptor::new("version", "INTEGER"),
            ]),
        ],
    )
}

/// Dataset ids of the public catalog, in listing order
pub fn public_datasets() -> Vec<&'static str> {
    vec!["austin_311", "baseball", "census_bureau_usa", "samples", "usa_names"]
}
