//! Result rows returned by the warehouse gateway.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{WarehouseError, WarehouseResult};

/// One result row: column name mapped to a JSON scalar.
///
/// The warehouse wire format is stringly typed; accessors perform the
/// lenient numeric coercion the API requires (numbers may arrive either as
/// JSON numbers or as decimal strings).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert, used by tests and the fakes module.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    fn require(&self, column: &str) -> WarehouseResult<&Value> {
        self.0.get(column).ok_or_else(|| WarehouseError::MissingColumn {
            column: column.to_string(),
        })
    }

    /// Read a column as `i64`. Null is a type mismatch; use [`Row::is_null`]
    /// first where null is a legal value.
    pub fn i64(&self, column: &str) -> WarehouseResult<i64> {
        let value = self.require(column)?;
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or(WarehouseError::TypeMismatch {
                    column: column.to_string(),
                    expected: "integer",
                }),
            Value::String(s) => s.parse::<i64>().map_err(|_| WarehouseError::TypeMismatch {
                column: column.to_string(),
                expected: "integer",
            }),
            _ => Err(WarehouseError::TypeMismatch {
                column: column.to_string(),
                expected: "integer",
            }),
        }
    }

    /// Read a column as `f64`, coercing decimal strings.
    pub fn f64(&self, column: &str) -> WarehouseResult<f64> {
        let value = self.require(column)?;
        match value {
            Value::Number(n) => n.as_f64().ok_or(WarehouseError::TypeMismatch {
                column: column.to_string(),
                expected: "number",
            }),
            Value::String(s) => s.parse::<f64>().map_err(|_| WarehouseError::TypeMismatch {
                column: column.to_string(),
                expected: "number",
            }),
            _ => Err(WarehouseError::TypeMismatch {
                column: column.to_string(),
                expected: "number",
            }),
        }
    }

    /// Read a column as a string slice.
    pub fn str(&self, column: &str) -> WarehouseResult<&str> {
        match self.require(column)? {
            Value::String(s) => Ok(s.as_str()),
            _ => Err(WarehouseError::TypeMismatch {
                column: column.to_string(),
                expected: "string",
            }),
        }
    }

    /// Read a column as an ISO `YYYY-MM-DD` date.
    pub fn date(&self, column: &str) -> WarehouseResult<NaiveDate> {
        let raw = self.str(column)?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| WarehouseError::TypeMismatch {
            column: column.to_string(),
            expected: "date",
        })
    }

    /// Whether the column is absent or JSON null.
    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.0.get(column), None | Some(Value::Null))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}
