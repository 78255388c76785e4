//! In-memory table.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::bigquery::{RowSink, bind_row};
use crate::error::InsertError;
use crate::types::{OutputRow, TableRef, TableSchema};
use crate::{Error, Result};

/// In-memory table with a fixed reference and schema.
#[derive(Clone)]
pub struct InMemoryTable {
    table: TableRef,
    schema: TableSchema,
    inner: Arc<RwLock<TableData>>,
}

#[derive(Default)]
struct TableData {
    rows: Vec<OutputRow>,
    /// Errors reported for every insert while set.
    reject_with: Option<Vec<InsertError>>,
}

impl InMemoryTable {
    /// Create an empty table.
    pub fn new(table: TableRef, schema: TableSchema) -> Self {
        Self {
            table,
            schema,
            inner: Arc::new(RwLock::new(TableData::default())),
        }
    }

    /// Create an empty table with `original` and `transformed` columns.
    pub fn with_default_schema(table: TableRef) -> Self {
        Self::new(table, TableSchema::new(["original", "transformed"]))
    }

    /// Report `errors` for every insert until [`accept_inserts`](Self::accept_inserts).
    pub async fn reject_inserts(&self, errors: Vec<InsertError>) {
        self.inner.write().await.reject_with = Some(errors);
    }

    /// Stop rejecting inserts.
    pub async fn accept_inserts(&self) {
        self.inner.write().await.reject_with = None;
    }

    /// Rows appended so far.
    pub async fn rows(&self) -> Vec<OutputRow> {
        self.inner.read().await.rows.clone()
    }
}

#[async_trait]
impl RowSink for InMemoryTable {
    async fn resolve_table(&self, table: &TableRef) -> Result<TableSchema> {
        if *table != self.table {
            return Err(Error::TableNotFound(table.to_string()));
        }
        Ok(self.schema.clone())
    }

    async fn insert_row(&self, table: &TableRef, schema: &TableSchema, row: &OutputRow) -> Result<()> {
        if *table != self.table {
            return Err(Error::TableNotFound(table.to_string()));
        }
        bind_row(table, schema, row)?;

        let mut inner = self.inner.write().await;
        if let Some(errors) = &inner.reject_with {
            return Err(Error::Write {
                table: table.to_string(),
                errors: errors.clone(),
            });
        }

        inner.rows.push(row.clone());
        debug!(table = %table, rows = inner.rows.len(), "Row appended to in-memory table");
        Ok(())
    }
}
