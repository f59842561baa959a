// Copyright (c) 2024-2025 DictLite Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Tabular schema results returned by a DBMS connection

use crate::catalog::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a row set column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Int,
    UInt,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Text => "text",
            ColumnType::Int => "int",
            ColumnType::UInt => "uint",
        };
        write!(f, "{}", s)
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    UInt(u64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual rendering; `None` for nulls
    pub fn stringify(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
        }
    }

    /// Text content when non-null and non-empty
    pub fn non_empty_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Result of a schema fetch: typed columns and rows of cells
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<ColumnType>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<ColumnType>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builder-style row append
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the column layout is exactly `expected`
    pub fn has_columns(&self, expected: &[ColumnType]) -> bool {
        self.columns.as_slice() == expected
    }

    /// Check the column layout, failing with `SchemaMismatch`
    ///
    /// Rows shorter than the layout are rejected as well, so callers may
    /// index cells freely afterwards.
    pub fn expect_columns(&self, what: &str, expected: &[ColumnType]) -> CatalogResult<()> {
        if !self.has_columns(expected) {
            let got: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
            let want: Vec<String> = expected.iter().map(|c| c.to_string()).collect();
            return Err(CatalogError::SchemaMismatch(format!(
                "schema for list of {} is wrong: expected [{}], got [{}]",
                what,
                want.join(", "),
                got.join(", ")
            )));
        }
        if let Some(pos) = self.rows.iter().position(|r| r.len() < expected.len()) {
            return Err(CatalogError::SchemaMismatch(format!(
                "row {} of list of {} has {} cells, expected {}",
                pos,
                what,
                self.rows[pos].len(),
                expected.len()
            )));
        }
        Ok(())
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_columns() {
        let rs = RowSet::new(vec![ColumnType::Text, ColumnType::UInt])
            .with_row(vec!["int4".into(), Value::UInt(3)]);
        assert!(rs.expect_columns("types", &[ColumnType::Text, ColumnType::UInt]).is_ok());

        let err = rs.expect_columns("types", &[ColumnType::Text]).unwrap_err();
        assert!(matches!(err, CatalogError::SchemaMismatch(_)));
    }

    #[test]
    fn test_short_row_rejected() {
        let rs = RowSet::new(vec![ColumnType::Text, ColumnType::Text]).with_row(vec!["x".into()]);
        assert!(matches!(
            rs.expect_columns("functions", &[ColumnType::Text, ColumnType::Text]),
            Err(CatalogError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_value_helpers() {
        assert_eq!(Value::Null.stringify(), None);
        assert_eq!(Value::Int(-2).stringify(), Some("-2".to_string()));
        assert_eq!(Value::Text(String::new()).non_empty_text(), None);
        assert_eq!(Value::Int(7).as_u64(), Some(7));
        assert_eq!(Value::Int(-7).as_u64(), None);

        let rs = RowSet::new(vec![ColumnType::Text]);
        assert_eq!(rs.value(4, 0), &Value::Null);
    }

    #[test]
    fn test_json_fixture_shape() {
        let rs: RowSet = serde_json::from_str(
            r#"{"columns":["Text","UInt"],"rows":[[{"Text":"bool"},{"UInt":2}]]}"#,
        )
        .unwrap();
        assert_eq!(rs.n_rows(), 1);
        assert_eq!(rs.n_columns(), 2);
    }
}
