use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    model::{TableId, WeatherRecord, WeatherRow},
    warehouse::{InsertError, Warehouse, WarehouseError, format_insert_errors},
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Encountered errors while inserting rows: {}", format_insert_errors(.0))]
    Rejected(Vec<InsertError>),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Stamps `record` with the current UTC time and appends it as one row.
///
/// Failures are logged and returned, never retried.
pub async fn load<W>(
    warehouse: &W,
    table: &TableId,
    record: WeatherRecord,
) -> Result<WeatherRow, LoadError>
where
    W: Warehouse + ?Sized,
{
    let row = WeatherRow::new(record, Utc::now());
    let city = row.record.display_city().to_owned();
    let json = serde_json::to_value(&row)?;

    let result = match warehouse.insert_rows_json(table, &[json]).await {
        Ok(errors) if errors.is_empty() => Ok(row),
        Ok(errors) => Err(LoadError::Rejected(errors)),
        Err(err) => Err(LoadError::Warehouse(err)),
    };

    match &result {
        Ok(_) => info!(city = %city, table = %table, "Data for {city} inserted successfully"),
        Err(err) => debug!(city = %city, table = %table, "{err}"),
    }

    result
}
