use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::model::RawObservation;

use super::{FetchError, WeatherFetcher};

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn request_current(&self, city: &str) -> Result<RawObservation, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(city, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FetchError::from_reqwest(city, e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                city: city.to_owned(),
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            city: city.to_owned(),
            source,
        })
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherProvider {
    async fn fetch_current(&self, city: &str) -> Result<RawObservation, FetchError> {
        debug!(city = %city, "requesting current weather");

        let result = self.request_current(city).await;
        if let Err(err) = &result {
            debug!(city = %city, kind = err.kind(), "{err}");
        }
        result
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Reply, serve};
    use serde_json::json;

    const LONDON: &str = r#"{"name":"London","main":{"temp":15.2,"humidity":70},"weather":[{"description":"clear sky"}],"wind":{"speed":3.1}}"#;

    fn provider(base_url: &str, timeout: Duration) -> OpenWeatherProvider {
        OpenWeatherProvider::with_base_url("KEY".to_string(), base_url, timeout).unwrap()
    }

    #[tokio::test]
    async fn returns_raw_document_on_success() {
        let mut stub = serve(vec![Reply::Json(200, LONDON.to_string())]).await;
        let owm = provider(&stub.base_url, DEFAULT_TIMEOUT);

        let raw = owm.fetch_current("London").await.unwrap();
        assert_eq!(raw["name"], json!("London"));
        assert_eq!(raw["main"]["humidity"], json!(70));

        let request = stub.next_request().await;
        let line = request.head.lines().next().unwrap();
        assert!(line.starts_with("GET /data/2.5/weather?"), "{line}");
        assert!(line.contains("q=London"));
        assert!(line.contains("appid=KEY"));
        assert!(line.contains("units=metric"));
    }

    #[tokio::test]
    async fn city_names_are_url_encoded() {
        let mut stub = serve(vec![Reply::Json(200, LONDON.to_string())]).await;
        let owm = provider(&stub.base_url, DEFAULT_TIMEOUT);

        owm.fetch_current("São Paulo").await.unwrap();

        let request = stub.next_request().await;
        let line = request.head.lines().next().unwrap();
        assert!(line.contains("q=S%C3%A3o+Paulo"), "{line}");
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let stub = serve(vec![Reply::Json(
            404,
            r#"{"cod":"404","message":"city not found"}"#.to_string(),
        )])
        .await;
        let owm = provider(&stub.base_url, DEFAULT_TIMEOUT);

        let err = owm.fetch_current("Atlantis").await.unwrap_err();
        match &err {
            FetchError::Status { city, status, body } => {
                assert_eq!(city, "Atlantis");
                assert_eq!(status.as_u16(), 404);
                assert!(body.contains("city not found"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let stub = serve(vec![Reply::Json(503, "{}".to_string())]).await;
        let owm = provider(&stub.base_url, DEFAULT_TIMEOUT);

        let err = owm.fetch_current("Tokyo").await.unwrap_err();
        assert_eq!(err.kind(), "http_status");
        assert_eq!(err.city(), "Tokyo");
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let stub = serve(vec![Reply::Silent]).await;
        let owm = provider(&stub.base_url, Duration::from_millis(200));

        let err = owm.fetch_current("Atlantis").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "{err:?}");
        assert!(err.to_string().contains("Atlantis"));
    }

    #[tokio::test]
    async fn connection_refused_is_reported() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let owm = provider(&format!("http://{addr}"), DEFAULT_TIMEOUT);
        let err = owm.fetch_current("Sydney").await.unwrap_err();
        assert_eq!(err.kind(), "connect");
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let stub = serve(vec![Reply::Json(200, "<html>maintenance</html>".to_string())]).await;
        let owm = provider(&stub.base_url, DEFAULT_TIMEOUT);

        let err = owm.fetch_current("Paris").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[test]
    fn truncate_long_bodies() {
        let body = "x".repeat(500);
        let t = truncate_body(&body);
        assert_eq!(t.len(), 203);
        assert!(t.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(150);
        let t = truncate_body(&body);
        assert!(t.ends_with("..."));
    }
}
