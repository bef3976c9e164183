use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Untyped provider response for one city. Only lives between fetch and normalize.
pub type RawObservation = serde_json::Value;

/// Normalized current weather for one city. Every field may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: Option<String>,
    /// Celsius.
    pub temperature: Option<f64>,
    pub description: Option<String>,
    /// Percent.
    pub humidity: Option<i64>,
    /// Meters per second.
    pub wind_speed: Option<f64>,
}

impl WeatherRecord {
    /// Name used in diagnostics; falls back to a placeholder when the provider omitted it.
    pub fn display_city(&self) -> &str {
        self.city.as_deref().unwrap_or("<unknown>")
    }
}

/// A record stamped at load time. This is exactly the shape appended to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRow {
    #[serde(flatten)]
    pub record: WeatherRecord,
    #[serde(serialize_with = "iso8601_micros")]
    pub timestamp: DateTime<Utc>,
}

impl WeatherRow {
    pub fn new(record: WeatherRecord, timestamp: DateTime<Utc>) -> Self {
        Self { record, timestamp }
    }
}

fn iso8601_micros<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Fully-qualified warehouse table, `project.dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self { project: project.into(), dataset: dataset.into(), table: table.into() }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

impl FromStr for TableId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split('.').collect();

        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(TableId::new(*project, *dataset, *table))
            }
            _ => Err(anyhow::anyhow!(
                "Invalid table id '{value}'. Expected the form project.dataset.table."
            )),
        }
    }
}
