//! Binary crate for the `weather-ingest` batch job.
//!
//! This crate focuses on:
//! - Loading `.env` and initializing logging
//! - Building the provider and warehouse clients from configuration
//! - Running the pipeline once and exiting

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
