//! Tabular result types.
//!
//! Defines the structures used to represent rows returned by any execution strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, RunnerError};

/// Rows returned by exactly one successful strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    /// Column names, when the strategy's payload carries them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    /// Rows of data.
    pub rows: Vec<Row>,
}

impl TabularResult {
    /// Creates a result with the given columns and rows.
    pub fn new(columns: Option<Vec<String>>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds a result from a JSON array of arrays, as returned in `data_array`
    /// or a command's `results.data`.
    ///
    /// Anything other than an array of arrays is a malformed result.
    pub fn from_json_rows(
        columns: Option<Vec<String>>,
        data: &serde_json::Value,
    ) -> Result<Self> {
        let raw_rows = data
            .as_array()
            .ok_or_else(|| RunnerError::malformed("row data is not an array"))?;

        let rows = raw_rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.as_array()
                    .map(|cells| cells.iter().map(Value::from).collect())
                    .ok_or_else(|| RunnerError::malformed(format!("row {i} is not an array")))
            })
            .collect::<Result<Vec<Row>>>()?;

        Ok(Self { columns, rows })
    }
}

/// A row of data.
pub type Row = Vec<Value>;

/// A single scalar cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value. Nested arrays and objects are kept as their JSON text.
    String(String),
}

impl Value {
    /// Converts the value to its display representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
