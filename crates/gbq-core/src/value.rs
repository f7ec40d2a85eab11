//! Scalar values of a query result and their display form

use crate::metadata::FieldDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown for NULL cells
pub const NULL_PLACEHOLDER: &str = "NULL";

/// A single cell of a result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Record(Vec<Value>),
}

/// An ordered sequence of cells
pub type Row = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(NULL_PLACEHOLDER),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => write_joined(f, "[", items, "]"),
            Self::Record(items) => write_joined(f, "{", items, "}"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

/// Best-effort display text for a cell. Never fails.
pub fn format_value(value: &Value) -> String {
    value.to_string()
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Decode a raw JSON cell from the query API using its schema field
///
/// Scalars arrive as strings and are typed by the declared column type;
/// REPEATED cells are `[{"v": ..}]` and RECORD cells are `{"f": [{"v": ..}]}`.
/// Anything that does not fit falls back to its JSON text.
pub fn decode_cell(raw: &serde_json::Value, field: &FieldDescriptor) -> Value {
    use serde_json::Value as Json;

    if raw.is_null() {
        return Value::Null;
    }

    if field.is_repeated() {
        if let Json::Array(items) = raw {
            let element = FieldDescriptor {
                mode: crate::metadata::FieldMode::Nullable,
                ..field.clone()
            };
            return Value::Array(
                items
                    .iter()
                    .map(|item| decode_cell(unwrap_v(item), &element))
                    .collect(),
            );
        }
    }

    if field.is_record() {
        if let Some(Json::Array(cells)) = raw.get("f") {
            return Value::Record(
                cells
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| match field.fields.get(i) {
                        Some(sub) => decode_cell(unwrap_v(cell), sub),
                        None => json_fallback(unwrap_v(cell)),
                    })
                    .collect(),
            );
        }
    }

    match raw {
        Json::String(s) => decode_scalar(s, &field.base_type()),
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or_else(|| Value::String(n.to_string())),
        other => json_fallback(other),
    }
}

fn unwrap_v(cell: &serde_json::Value) -> &serde_json::Value {
    cell.get("v").unwrap_or(cell)
}

fn decode_scalar(text: &str, base_type: &str) -> Value {
    match base_type {
        "INTEGER" | "INT64" | "INT" | "SMALLINT" | "BIGINT" | "TINYINT" | "BYTEINT" => text
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        "FLOAT" | "FLOAT64" => text
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        "BOOLEAN" | "BOOL" => match text.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        },
        // NUMERIC, DATE, TIMESTAMP, BYTES, ... keep the wire text
        _ => Value::String(text.to_string()),
    }
}

fn json_fallback(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}
