use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{model::TableId, warehouse::auth::ServiceAccountKey};

pub const ENV_API_KEY: &str = "OWM_API_KEY";
pub const ENV_CONFIG_PATH: &str = "WEATHER_INGEST_CONFIG";
pub const ENV_CREDENTIALS_PATH: &str = "WEATHER_CREDENTIALS_PATH";
pub const ENV_GOOGLE_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_TABLE_ID: &str = "WEATHER_TABLE_ID";
pub const ENV_CITIES: &str = "WEATHER_CITIES";

pub const DEFAULT_CITIES: &[&str] = &[
    "London",
    "New York",
    "Tokyo",
    "Paris",
    "Sydney",
    "São Paulo",
    "Rio de Janeiro",
];

/// Fatal setup problems. Any of these stops the run before the first city.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("API key not found. Set OWM_API_KEY in the environment or your .env file.")]
    MissingApiKey,

    #[error("No cities configured.")]
    NoCities,

    #[error(
        "No target table configured. Set WEATHER_TABLE_ID or provide credentials with a project id."
    )]
    MissingTable,

    #[error("Invalid table id '{0}'. Expected the form project.dataset.table.")]
    InvalidTableId(String),
}

/// Raw, layered configuration: defaults, then an optional TOML file, then the environment.
///
/// Example TOML:
/// cities = ["London", "Paris"]
/// dataset = "americanflat_weather"
/// table = "weather_data"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub cities: Vec<String>,
    pub credentials_path: PathBuf,
    /// Full `project.dataset.table`; wins over `dataset`/`table` when set.
    pub table_id: Option<String>,
    pub dataset: String,
    pub table: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            credentials_path: PathBuf::from("./serviceaccount.json"),
            table_id: None,
            dataset: "americanflat_weather".to_string(),
            table: "weather_data".to_string(),
        }
    }
}

/// Checked configuration handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub api_key: String,
    pub cities: Vec<String>,
    pub table: TableId,
}

impl Config {
    /// Load from the default config file location and the process environment.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = match env(ENV_CONFIG_PATH) {
            Some(p) => Some(PathBuf::from(p)),
            None => Self::config_file_path().ok(),
        };

        Self::load_from(path.as_deref(), env)
    }

    /// Load from an optional TOML file, then apply overrides from `env`.
    ///
    /// A path that does not exist is treated as "no file".
    pub fn load_from(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            _ => Self::default(),
        };

        cfg.apply_env(env);
        Ok(cfg)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(path) = non_empty(ENV_CREDENTIALS_PATH).or_else(|| non_empty(ENV_GOOGLE_CREDENTIALS)) {
            self.credentials_path = PathBuf::from(path);
        }
        if let Some(table_id) = non_empty(ENV_TABLE_ID) {
            self.table_id = Some(table_id);
        }
        if let Some(cities) = non_empty(ENV_CITIES) {
            self.cities = cities
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
                .collect();
        }
    }

    /// Path to the platform config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-ingest")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the API key, or the error that must abort the run.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Check everything the pipeline needs.
    ///
    /// `default_project` is used for the table when no full `table_id` is set,
    /// normally the project of the service-account credentials.
    pub fn validate(&self, default_project: Option<&str>) -> Result<IngestSettings, ConfigError> {
        let api_key = self.api_key()?.to_string();

        let cities: Vec<String> = self
            .cities
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();
        if cities.is_empty() {
            return Err(ConfigError::NoCities);
        }

        let table = match (&self.table_id, default_project) {
            (Some(id), _) => id
                .parse::<TableId>()
                .map_err(|_| ConfigError::InvalidTableId(id.clone()))?,
            (None, Some(project)) if !project.is_empty() => {
                let id = format!("{project}.{}.{}", self.dataset, self.table);
                id.parse::<TableId>()
                    .map_err(|_| ConfigError::InvalidTableId(id))?
            }
            (None, _) => return Err(ConfigError::MissingTable),
        };

        Ok(IngestSettings { api_key, cities, table })
    }

    /// Everything a run needs before the first city, checked in order:
    /// API key, then the credentials file, then the rest of the settings.
    pub fn resolve(&self) -> Result<(IngestSettings, ServiceAccountKey)> {
        self.api_key()?;

        let key = ServiceAccountKey::from_file(&self.credentials_path)?;
        let settings = self.validate(Some(&key.project_id))?;

        Ok((settings, key))
    }
}
