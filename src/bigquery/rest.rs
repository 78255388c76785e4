//! REST client for Google BigQuery.
//!
//! ## API Endpoints
//!
//! - `GET /bigquery/v2/projects/{project}/datasets/{dataset}/tables/{table}` - Get table metadata
//! - `POST /bigquery/v2/projects/{project}/datasets/{dataset}/tables/{table}/insertAll` - Stream rows

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::bigquery::{RowSink, bind_row};
use crate::config::RelayConfig;
use crate::error::InsertError;
use crate::http::{authorize, build_client, error_from_response, error_message};
use crate::types::{OutputRow, TableRef, TableSchema};
use crate::{Error, Result};

/// Table resource (only the parts the relay reads).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table schema.
    #[serde(default)]
    pub schema: Option<Schema>,
}

/// Table schema.
#[derive(Debug, Default, Deserialize)]
pub struct Schema {
    /// Top-level fields in order.
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

/// One schema field.
#[derive(Debug, Deserialize)]
pub struct FieldSchema {
    /// Column name.
    pub name: String,
    /// Column type (e.g. `STRING`).
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
}

/// Request for streaming rows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllRequest {
    /// Rows to insert.
    pub rows: Vec<InsertRow>,
}

/// One row of an insert request.
#[derive(Debug, Serialize)]
pub struct InsertRow {
    /// Column values keyed by column name.
    pub json: Map<String, Value>,
}

/// Response for streaming rows.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllResponse {
    /// Per-row errors. Absent when every row was accepted.
    #[serde(default)]
    pub insert_errors: Vec<RowErrors>,
}

/// Errors for one row.
#[derive(Debug, Deserialize)]
pub struct RowErrors {
    /// Index of the row in the request.
    #[serde(default)]
    pub index: u32,
    /// Error details.
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

/// Error detail as reported by BigQuery.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    /// Short error code.
    #[serde(default)]
    pub reason: String,
    /// Where the error occurred.
    #[serde(default)]
    pub location: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl InsertAllResponse {
    /// Flatten the per-row errors.
    pub fn into_errors(self) -> Vec<InsertError> {
        self.insert_errors
            .into_iter()
            .flat_map(|row| {
                let index = row.index;
                row.errors.into_iter().map(move |e| InsertError {
                    index,
                    reason: e.reason,
                    location: e.location.filter(|l| !l.is_empty()),
                    message: e.message,
                })
            })
            .collect()
    }
}

/// BigQuery REST client.
pub struct BigQueryRestClient {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
}

impl BigQueryRestClient {
    /// Create a client for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_token: None,
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Ok(Self::new(config.bigquery.resolve_endpoint())?
            .with_access_token(config.auth.access_token.clone()))
    }

    /// Set the bearer token.
    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn table_url(&self, table: &TableRef) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}",
            self.endpoint, table.project_id, table.dataset, table.table
        )
    }
}

#[async_trait]
impl RowSink for BigQueryRestClient {
    async fn resolve_table(&self, table: &TableRef) -> Result<TableSchema> {
        let url = self.table_url(table);
        debug!(url = %url, "Fetching table metadata");

        let response = authorize(self.client.get(&url), self.access_token.as_deref())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(
                error_from_response(response, || Error::TableNotFound(table.to_string())).await,
            );
        }

        let resource: Table = response.json().await?;
        let fields = resource.schema.unwrap_or_default().fields;
        Ok(TableSchema::new(fields.into_iter().map(|f| f.name)))
    }

    async fn insert_row(&self, table: &TableRef, schema: &TableSchema, row: &OutputRow) -> Result<()> {
        let url = format!("{}/insertAll", self.table_url(table));
        let request = InsertAllRequest {
            rows: vec![InsertRow {
                json: bind_row(table, schema, row)?,
            }],
        };

        debug!(url = %url, "Streaming row");

        let response = authorize(self.client.post(&url), self.access_token.as_deref())
            .json(&request)
            .send()
            .await?;

        // insertAll reports every rejection as a failed write, 404 included.
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Write {
                table: table.to_string(),
                errors: vec![InsertError {
                    index: 0,
                    reason: format!("http_{}", status.as_u16()),
                    location: None,
                    message: error_message(response).await,
                }],
            });
        }

        let errors = response.json::<InsertAllResponse>().await?.into_errors();
        if !errors.is_empty() {
            return Err(Error::Write {
                table: table.to_string(),
                errors,
            });
        }

        Ok(())
    }
}
