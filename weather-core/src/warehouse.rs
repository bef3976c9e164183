use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

use crate::model::TableId;

pub mod auth;
pub mod bigquery;

/// One rejected row as reported by the streaming insert endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertError {
    pub index: u64,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub debug_info: String,
}

/// Renders insert errors the way they are logged: as their JSON payload.
pub fn format_insert_errors(errors: &[InsertError]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| format!("{errors:?}"))
}

/// The insert call itself failed; no per-row verdict is available.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Failed to obtain access token: {0}")]
    Auth(String),

    #[error("Warehouse request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Warehouse request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to parse warehouse response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Append-only row sink.
///
/// `Ok` carries the per-row errors; an empty list means every row was accepted.
#[async_trait]
pub trait Warehouse: Send + Sync + Debug {
    async fn insert_rows_json(
        &self,
        table: &TableId,
        rows: &[serde_json::Value],
    ) -> Result<Vec<InsertError>, WarehouseError>;
}
