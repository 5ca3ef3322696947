//! Builds a [`WeatherSnapshot`] out of a raw Open-Meteo forecast payload.

use serde::Deserialize;
use serde_json::Value;

use crate::resolver::{self, Fallback, FieldSpec};
use crate::types::{MeasurementUnits, WeatherSnapshot};

static NULL: Value = Value::Null;

/// Forecast response exactly as received. Only read through the resolver.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawForecastPayload(pub Value);

impl RawForecastPayload {
    /// Point-in-time section: `current_weather` (legacy) or `current`
    pub fn current(&self) -> &Value {
        match self.0.get("current_weather").filter(|v| v.is_object()) {
            Some(section) => section,
            None => self.0.get("current").unwrap_or(&NULL),
        }
    }

    pub fn hourly(&self) -> &Value {
        self.0.get("hourly").unwrap_or(&NULL)
    }
}

impl From<Value> for RawForecastPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Hourly index matching the current reading.
///
/// Exact timestamp match first, otherwise the last hour as the best recent
/// estimate; `None` when the hourly series is empty or missing.
pub fn align_index(current: &Value, hourly: &Value) -> Option<usize> {
    let times = hourly.get("time").and_then(Value::as_array)?;
    if times.is_empty() {
        return None;
    }

    current
        .get("time")
        .and_then(Value::as_str)
        .and_then(|now| times.iter().position(|t| t.as_str() == Some(now)))
        .or(Some(times.len() - 1))
}

/// Normalize a payload into a fully populated snapshot. Never fails.
pub fn build(payload: &RawForecastPayload, units: MeasurementUnits) -> WeatherSnapshot {
    let current = payload.current();
    let hourly = payload.hourly();
    let index = align_index(current, hourly);

    // "feels like" never borrows an hourly temperature
    let current_temperature =
        resolver::resolve_current(current, resolver::TEMPERATURE.current).unwrap_or(0.0);
    let field = |spec: &FieldSpec| resolve_field(spec, current, hourly, index, current_temperature);
    let temperature = field(&resolver::TEMPERATURE);

    let wind_direction = field(&resolver::WIND_DIRECTION);
    let wind_direction = if wind_direction.is_finite() {
        wind_direction.rem_euclid(360.0)
    } else {
        0.0
    };

    let weather_code = field(&resolver::WEATHER_CODE);
    let weather_code = if weather_code.is_finite() {
        weather_code.round() as i32
    } else {
        0
    };

    WeatherSnapshot {
        time: current
            .get("time")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        temperature,
        apparent_temperature: field(&resolver::APPARENT_TEMPERATURE),
        relative_humidity: field(&resolver::RELATIVE_HUMIDITY),
        precipitation: field(&resolver::PRECIPITATION),
        rain: field(&resolver::RAIN),
        showers: field(&resolver::SHOWERS),
        snowfall: field(&resolver::SNOWFALL),
        cloud_cover: field(&resolver::CLOUD_COVER),
        wind_speed: field(&resolver::WIND_SPEED),
        wind_gusts: field(&resolver::WIND_GUSTS),
        wind_direction,
        weather_code,
        units,
    }
}

fn resolve_field(
    spec: &FieldSpec,
    current: &Value,
    hourly: &Value,
    index: Option<usize>,
    current_temperature: f64,
) -> f64 {
    spec.lookup(current, hourly, index)
        .unwrap_or(match spec.fallback {
            Fallback::Zero => 0.0,
            Fallback::CurrentTemperature => current_temperature,
        })
}
