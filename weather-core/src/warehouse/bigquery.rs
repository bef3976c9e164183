use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::model::TableId;

use super::{
    InsertError, Warehouse, WarehouseError,
    auth::{ServiceAccountKey, ServiceAccountTokenSource, TokenSource},
};

pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com";
/// Bounds both the token exchange and the insert call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Streaming-insert client for BigQuery's `tabledata.insertAll` REST endpoint.
#[derive(Debug)]
pub struct BigQueryClient {
    project_id: String,
    base_url: String,
    http: Client,
    tokens: Box<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct InsertAllResponse {
    #[serde(rename = "insertErrors", default)]
    insert_errors: Vec<InsertError>,
}

impl BigQueryClient {
    pub fn new(project_id: String, tokens: Box<dyn TokenSource>) -> Result<Self> {
        Self::with_base_url(project_id, tokens, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(
        project_id: String,
        tokens: Box<dyn TokenSource>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = http_client(timeout)?;

        Ok(Self {
            project_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            tokens,
        })
    }

    /// Builds a client authenticated as the service account, billed to its project.
    pub fn from_service_account(key: ServiceAccountKey) -> Result<Self> {
        let project_id = key.project_id.clone();
        let tokens = ServiceAccountTokenSource::new(key, http_client(DEFAULT_TIMEOUT)?);
        Self::new(project_id, Box::new(tokens))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn insert_all_url(&self, table: &TableId) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url, table.project, table.dataset, table.table
        )
    }
}

/// Client shared by the insert and token calls; no request may outlive `timeout`.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client for BigQuery")
}

fn insert_all_body(rows: &[Value]) -> Value {
    json!({
        "kind": "bigquery#tableDataInsertAllRequest",
        "rows": rows.iter().map(|row| json!({ "json": row })).collect::<Vec<_>>(),
    })
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn insert_rows_json(
        &self,
        table: &TableId,
        rows: &[Value],
    ) -> Result<Vec<InsertError>, WarehouseError> {
        let token = self.tokens.access_token().await?;

        debug!(table = %table, rows = rows.len(), "streaming insert");

        let res = self
            .http
            .post(self.insert_all_url(table))
            .bearer_auth(token)
            .json(&insert_all_body(rows))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WarehouseError::Status { status, body });
        }

        let parsed: InsertAllResponse = serde_json::from_str(&body)?;
        Ok(parsed.insert_errors)
    }
}
