//! Service-account credentials and OAuth2 JWT-bearer access tokens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use tokio::sync::Mutex;
use tracing::debug;

use super::WarehouseError;

pub const INSERT_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.insertdata";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// The JSON key file downloaded for a Google service account.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("Failed to parse credentials file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)?;

        match key.key_type.as_deref() {
            Some(kind) if kind != "service_account" => {
                anyhow::bail!("Expected a service_account key, found '{kind}'")
            }
            _ => {}
        }

        Ok(key)
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync + fmt::Debug {
    async fn access_token(&self) -> Result<String, WarehouseError>;
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[cfg(test)]
#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, WarehouseError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    TOKEN_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges a signed JWT for an access token and caches it until shortly before expiry.
#[derive(Debug)]
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    scope: String,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, http: Client) -> Self {
        Self {
            key,
            scope: INSERT_SCOPE.to_string(),
            http,
            cached: Mutex::new(None),
        }
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, WarehouseError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
        };

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| WarehouseError::Auth(format!("invalid private key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| WarehouseError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, WarehouseError> {
        let assertion = self.signed_assertion(now)?;

        let res = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WarehouseError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        debug!(client = %self.key.client_email, expires_in = parsed.expires_in, "obtained access token");

        // The endpoint's value is untrusted; never cache past the lifetime we asked for.
        let lifetime = parsed.expires_in.clamp(0, TOKEN_LIFETIME_SECS);

        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, WarehouseError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        let margin = Duration::seconds(REFRESH_MARGIN_SECS);
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at - margin > now) {
            return Ok(token.token.clone());
        }

        let fresh = self.exchange(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
