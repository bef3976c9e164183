use anyhow::Context;
use clap::Parser;
use tracing::info;
use weather_core::{
    Config, Pipeline,
    provider::openweather::OpenWeatherProvider,
    warehouse::bigquery::BigQueryClient,
};

/// Top-level CLI struct. The run itself takes no arguments.
#[derive(Debug, Parser)]
#[command(
    name = "weather-ingest",
    version,
    about = "Fetch current weather for the configured cities and stream it into BigQuery",
    long_about = "Fetch current weather for the configured cities and stream it into BigQuery.\n\n\
                  Configuration comes from an optional TOML file (WEATHER_INGEST_CONFIG) and the \
                  environment: OWM_API_KEY, WEATHER_CREDENTIALS_PATH, WEATHER_TABLE_ID, WEATHER_CITIES."
)]
pub struct Cli {}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let (settings, key) = Config::load()?.resolve()?;

        let fetcher = OpenWeatherProvider::new(settings.api_key.clone())?;
        let warehouse = BigQueryClient::from_service_account(key)
            .context("Failed to initialize the BigQuery client")?;

        let report = Pipeline::new(settings, fetcher, warehouse).run().await;

        let elapsed = report.finished_at - report.started_at;
        info!(
            loaded = report.loaded_count(),
            failed = report.failed_count(),
            elapsed_ms = elapsed.num_milliseconds(),
            "done"
        );

        Ok(())
    }
}
