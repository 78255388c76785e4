//! BigQuery side of the relay.
//!
//! This module provides the sink stage:
//! - [`RowSink`], the seam the pipeline writes through
//! - [`rest::BigQueryRestClient`], a client for the BigQuery REST v2 API
//! - [`memory::InMemoryTable`], a local table for tests and embedding

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::InsertError;
use crate::types::{OutputRow, TableRef, TableSchema};
use crate::{Error, Result};

pub mod memory;
pub mod rest;

pub use memory::InMemoryTable;
pub use rest::BigQueryRestClient;

/// A table rows can be appended to.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Look up the table and return its column layout.
    async fn resolve_table(&self, table: &TableRef) -> Result<TableSchema>;

    /// Append one row.
    ///
    /// Fails with [`Error::Write`] when the table reports any error for the insert.
    async fn insert_row(&self, table: &TableRef, schema: &TableSchema, row: &OutputRow) -> Result<()>;
}

/// Bind a row's two values to the first two columns of `schema`.
///
/// Columns past the second are left unset.
pub fn bind_row(table: &TableRef, schema: &TableSchema, row: &OutputRow) -> Result<Map<String, Value>> {
    let [original_column, transformed_column, ..] = schema.columns.as_slice() else {
        return Err(Error::Write {
            table: table.to_string(),
            errors: vec![InsertError {
                index: 0,
                reason: "invalid".to_string(),
                location: None,
                message: format!(
                    "table has {} column(s), a row needs 2",
                    schema.columns.len()
                ),
            }],
        });
    };

    let mut values = Map::new();
    values.insert(original_column.clone(), Value::String(row.original.clone()));
    values.insert(transformed_column.clone(), Value::String(row.transformed.clone()));
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_row_positional() {
        let table = TableRef::new("p", "demo", "demo_result");
        let schema = TableSchema::new(["input", "output", "extra"]);
        let values = bind_row(&table, &schema, &OutputRow::new("hello 12", "HELLO 1020")).unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values["input"], "hello 12");
        assert_eq!(values["output"], "HELLO 1020");
    }

    #[test]
    fn test_bind_row_needs_two_columns() {
        let table = TableRef::new("p", "demo", "demo_result");
        let schema = TableSchema::new(["only"]);
        let err = bind_row(&table, &schema, &OutputRow::new("a 1", "A 10")).unwrap_err();

        assert!(matches!(err, Error::Write { ref table, .. } if table == "p.demo.demo_result"));
    }
}
