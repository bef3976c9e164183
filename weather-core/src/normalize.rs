//! Defensive decode of the provider document into a [`WeatherRecord`].
//!
//! Leaf values are optional: a missing or mistyped leaf becomes `None`.
//! Containers are not: `main`, `wind` and a non-empty `weather` list must be
//! present with the right JSON type, otherwise the whole record is rejected.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{RawObservation, WeatherRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("observation is not a JSON object")]
    NotAnObject,
    #[error("missing `{0}` block")]
    MissingBlock(&'static str),
    #[error("`{0}` block is not an object")]
    BlockNotAnObject(&'static str),
    #[error("missing `weather` conditions list")]
    MissingConditions,
    #[error("`weather` conditions is not a list")]
    ConditionsNotAList,
    #[error("`weather` conditions list is empty")]
    EmptyConditions,
    #[error("first `weather` condition is not an object")]
    ConditionNotAnObject,
}

pub fn normalize(raw: &RawObservation) -> Result<WeatherRecord, ShapeError> {
    let doc = raw.as_object().ok_or(ShapeError::NotAnObject)?;

    let main = block(doc, "main")?;
    let condition = first_condition(doc)?;
    let wind = block(doc, "wind")?;

    Ok(WeatherRecord {
        city: string_field(doc, "name"),
        temperature: main.get("temp").and_then(Value::as_f64),
        description: string_field(condition, "description"),
        humidity: main.get("humidity").and_then(integral),
        wind_speed: wind.get("speed").and_then(Value::as_f64),
    })
}

fn block<'a>(
    doc: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a Map<String, Value>, ShapeError> {
    doc.get(key)
        .ok_or(ShapeError::MissingBlock(key))?
        .as_object()
        .ok_or(ShapeError::BlockNotAnObject(key))
}

fn first_condition(doc: &Map<String, Value>) -> Result<&Map<String, Value>, ShapeError> {
    doc.get("weather")
        .ok_or(ShapeError::MissingConditions)?
        .as_array()
        .ok_or(ShapeError::ConditionsNotAList)?
        .first()
        .ok_or(ShapeError::EmptyConditions)?
        .as_object()
        .ok_or(ShapeError::ConditionNotAnObject)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

// Humidity is documented as an integer but some payloads carry `70.0`.
fn integral(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}
