//! Core library for the `weather-ingest` batch job.
//!
//! This crate defines:
//! - Configuration loading and validation
//! - The provider fetcher and the warehouse sink, behind traits
//! - Normalization of provider documents into flat records
//! - The per-city pipeline that ties them together
//!
//! It is used by `weather-ingest`, but the pipeline can be driven with any
//! [`WeatherFetcher`] and [`Warehouse`] implementation.

pub mod config;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod provider;
pub mod warehouse;

#[cfg(test)]
mod test_support;

pub use config::{Config, ConfigError, IngestSettings};
pub use model::{RawObservation, TableId, WeatherRecord, WeatherRow};
pub use pipeline::{CityOutcome, Pipeline, RunReport, StageError};
pub use provider::{FetchError, WeatherFetcher};
pub use warehouse::{InsertError, Warehouse, WarehouseError};
