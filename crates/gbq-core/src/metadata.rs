//! Table metadata as reported by the warehouse

use serde::{Deserialize, Serialize};

/// Column mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl FieldMode {
    /// Parse the mode string returned by the warehouse (missing means NULLABLE)
    pub fn from_api(mode: Option<&str>) -> Self {
        match mode.map(|m| m.trim().to_uppercase()).as_deref() {
            Some("REQUIRED") => Self::Required,
            Some("REPEATED") => Self::Repeated,
            _ => Self::Nullable,
        }
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    /// Warehouse type name, e.g. `INTEGER` or `RECORD`
    pub field_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub mode: FieldMode,

    /// Sub-fields of a RECORD column
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            description: String::new(),
            mode: FieldMode::Nullable,
            fields: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }

    /// Upper-cased base type name (`NUMERIC(10,2)` -> `NUMERIC`)
    pub fn base_type(&self) -> String {
        self.field_type
            .split(['(', '<'])
            .next()
            .unwrap_or(&self.field_type)
            .trim()
            .to_uppercase()
    }

    pub fn is_record(&self) -> bool {
        matches!(self.base_type().as_str(), "RECORD" | "STRUCT")
    }

    pub fn is_repeated(&self) -> bool {
        self.mode == FieldMode::Repeated
    }
}

/// Description, size and schema of a table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    #[serde(default)]
    pub description: String,

    pub row_count: i64,

    pub byte_size: i64,

    #[serde(default)]
    pub schema: Vec<FieldDescriptor>,
}

impl TableMetadata {
    pub fn new(row_count: i64, byte_size: i64, schema: Vec<FieldDescriptor>) -> Self {
        Self {
            description: String::new(),
            row_count,
            byte_size,
            schema,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
