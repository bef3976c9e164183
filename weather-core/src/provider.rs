use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt::Debug;
use thiserror::Error;

use crate::model::RawObservation;

pub mod openweather;

/// Why a single city's request produced no data. Never fatal to the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Connection error occurred for {city}: {source}")]
    Connect {
        city: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Timeout error occurred for {city}: {source}")]
    Timeout {
        city: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error occurred for {city}: status {status}: {body}")]
    Status {
        city: String,
        status: StatusCode,
        body: String,
    },

    #[error("Invalid JSON received for {city}: {source}")]
    Decode {
        city: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("An error occurred for {city}: {source}")]
    Request {
        city: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(city: &str, source: reqwest::Error) -> Self {
        let city = city.to_owned();
        if source.is_timeout() {
            FetchError::Timeout { city, source }
        } else if source.is_connect() {
            FetchError::Connect { city, source }
        } else {
            FetchError::Request { city, source }
        }
    }

    pub fn city(&self) -> &str {
        match self {
            FetchError::Connect { city, .. }
            | FetchError::Timeout { city, .. }
            | FetchError::Status { city, .. }
            | FetchError::Decode { city, .. }
            | FetchError::Request { city, .. } => city,
        }
    }

    /// Short tag for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Connect { .. } => "connect",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Status { .. } => "http_status",
            FetchError::Decode { .. } => "decode",
            FetchError::Request { .. } => "request",
        }
    }
}

/// Source of current-weather documents, one request per call.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch_current(&self, city: &str) -> Result<RawObservation, FetchError>;
}
