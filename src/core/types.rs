use super::{DriverError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Positional row as produced by the data generator, in the table's column order.
pub type Tuple = Vec<Value>;

/// A stored row: column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    columns: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record by pairing `columns` with `tuple` positionally.
    pub fn from_tuple(columns: &[&str], tuple: Tuple) -> Result<Self> {
        if columns.len() != tuple.len() {
            return Err(DriverError::InvalidParameters(format!(
                "Expected {} columns, got {}",
                columns.len(),
                tuple.len()
            )));
        }
        let columns = columns
            .iter()
            .map(|c| c.to_string())
            .zip(tuple)
            .collect();
        Ok(Self { columns })
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn value(&self, column: &str) -> Result<&Value> {
        self.columns.get(column).ok_or_else(|| {
            DriverError::TypeMismatch(format!("Column '{}' is not present", column))
        })
    }

    pub fn i64(&self, column: &str) -> Result<i64> {
        let value = self.value(column)?;
        value.as_i64().ok_or_else(|| {
            DriverError::TypeMismatch(format!(
                "Column '{}' expects INTEGER, got {}",
                column,
                value.type_name()
            ))
        })
    }

    pub fn f64(&self, column: &str) -> Result<f64> {
        let value = self.value(column)?;
        value.as_f64().ok_or_else(|| {
            DriverError::TypeMismatch(format!(
                "Column '{}' expects FLOAT, got {}",
                column,
                value.type_name()
            ))
        })
    }

    pub fn str(&self, column: &str) -> Result<&str> {
        let value = self.value(column)?;
        value.as_str().ok_or_else(|| {
            DriverError::TypeMismatch(format!(
                "Column '{}' expects TEXT, got {}",
                column,
                value.type_name()
            ))
        })
    }

    /// Copies the named columns into a new record, skipping absent ones.
    pub fn project(&self, columns: &[&str]) -> Record {
        let columns = columns
            .iter()
            .filter_map(|c| self.columns.get(*c).map(|v| (c.to_string(), v.clone())))
            .collect();
        Record { columns }
    }

    pub fn merge(&mut self, other: Record) {
        self.columns.extend(other.columns);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }
}

/// A row together with the store key it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    pub key: String,
    pub record: Record,
}

impl KeyedRecord {
    pub fn new(key: impl Into<String>, record: Record) -> Self {
        Self {
            key: key.into(),
            record,
        }
    }
}
