//! Per-city fetch → normalize → load, one city at a time.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::IngestSettings,
    loader::{LoadError, load},
    model::WeatherRow,
    normalize::{ShapeError, normalize},
    provider::{FetchError, WeatherFetcher},
    warehouse::Warehouse,
};

/// The stage at which a city was dropped from this run.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Failed to retrieve data: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to process data: {0}")]
    Normalize(#[from] ShapeError),

    #[error("Failed to load data: {0}")]
    Load(#[from] LoadError),
}

impl StageError {
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Fetch(_) => "fetch",
            StageError::Normalize(_) => "normalize",
            StageError::Load(_) => "load",
        }
    }
}

#[derive(Debug)]
pub struct CityOutcome {
    pub city: String,
    pub result: Result<WeatherRow, StageError>,
}

#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CityOutcome>,
}

impl RunReport {
    pub fn loaded(&self) -> impl Iterator<Item = &WeatherRow> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &StageError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.city.as_str(), e)))
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}

#[derive(Debug)]
pub struct Pipeline<F, W> {
    settings: IngestSettings,
    fetcher: F,
    warehouse: W,
}

impl<F, W> Pipeline<F, W>
where
    F: WeatherFetcher,
    W: Warehouse,
{
    pub fn new(settings: IngestSettings, fetcher: F, warehouse: W) -> Self {
        Self { settings, fetcher, warehouse }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Attempts every configured city once. Per-city failures are logged and recorded,
    /// never propagated.
    pub async fn run(&self) -> RunReport {
        let started_at = Utc::now();
        info!(
            cities = self.settings.cities.len(),
            table = %self.settings.table,
            "starting weather ingestion run"
        );

        let mut outcomes = Vec::with_capacity(self.settings.cities.len());
        for city in &self.settings.cities {
            let result = self.process_city(city).await;
            if let Err(err) = &result {
                warn!(city = %city, stage = err.stage(), "Skipping {city}: {err}");
            }
            outcomes.push(CityOutcome { city: city.clone(), result });
        }

        let report = RunReport { started_at, finished_at: Utc::now(), outcomes };
        info!(
            loaded = report.loaded_count(),
            failed = report.failed_count(),
            "weather ingestion run finished"
        );
        report
    }

    async fn process_city(&self, city: &str) -> Result<WeatherRow, StageError> {
        let raw = self.fetcher.fetch_current(city).await?;
        let record = normalize(&raw)?;
        let row = load(&self.warehouse, &self.settings.table, record).await?;
        Ok(row)
    }
}
