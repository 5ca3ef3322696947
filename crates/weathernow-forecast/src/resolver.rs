//! Field lookup across the naming conventions Open-Meteo uses for the same
//! quantity (`cloudcover` vs `cloud_cover`, `windspeed` vs `wind_speed_10m`).
//!
//! Resolution never fails: anything missing, mistyped or out of range is
//! "absent", and the caller decides the default.

use serde_json::Value;

/// Where a snapshot field falls back to when no upstream key has a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Zero,
    /// Use the current section's own air temperature, or 0 when it has none
    CurrentTemperature,
}

/// Lookup policy for one snapshot field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Keys tried, in order, against the point-in-time section
    pub current: &'static [&'static str],
    /// Keys tried, in order, against the hourly arrays
    pub hourly: &'static [&'static str],
    pub fallback: Fallback,
}

pub const TEMPERATURE: FieldSpec = FieldSpec {
    current: &["temperature", "temperature_2m"],
    hourly: &["temperature_2m", "temperature"],
    fallback: Fallback::Zero,
};

pub const APPARENT_TEMPERATURE: FieldSpec = FieldSpec {
    current: &["apparent_temperature"],
    hourly: &["apparent_temperature", "apparentTemperature"],
    fallback: Fallback::CurrentTemperature,
};

pub const RELATIVE_HUMIDITY: FieldSpec = FieldSpec {
    current: &["relative_humidity_2m", "relativehumidity_2m"],
    hourly: &["relativehumidity_2m", "relative_humidity_2m"],
    fallback: Fallback::Zero,
};

pub const PRECIPITATION: FieldSpec = FieldSpec {
    current: &["precipitation"],
    hourly: &["precipitation"],
    fallback: Fallback::Zero,
};

pub const RAIN: FieldSpec = FieldSpec {
    current: &["rain"],
    hourly: &["rain"],
    fallback: Fallback::Zero,
};

pub const SHOWERS: FieldSpec = FieldSpec {
    current: &["showers"],
    hourly: &["showers"],
    fallback: Fallback::Zero,
};

pub const SNOWFALL: FieldSpec = FieldSpec {
    current: &["snowfall"],
    hourly: &["snowfall"],
    fallback: Fallback::Zero,
};

pub const CLOUD_COVER: FieldSpec = FieldSpec {
    current: &["cloudcover", "cloud_cover"],
    hourly: &["cloudcover", "cloud_cover"],
    fallback: Fallback::Zero,
};

pub const WIND_SPEED: FieldSpec = FieldSpec {
    current: &["windspeed", "wind_speed_10m"],
    hourly: &["windspeed_10m", "wind_speed_10m"],
    fallback: Fallback::Zero,
};

pub const WIND_GUSTS: FieldSpec = FieldSpec {
    current: &["windgusts", "wind_gusts_10m"],
    hourly: &["windgusts_10m", "wind_gusts_10m"],
    fallback: Fallback::Zero,
};

pub const WIND_DIRECTION: FieldSpec = FieldSpec {
    current: &["winddirection", "wind_direction_10m"],
    hourly: &["winddirection_10m", "wind_direction_10m"],
    fallback: Fallback::Zero,
};

pub const WEATHER_CODE: FieldSpec = FieldSpec {
    current: &["weathercode", "weather_code"],
    hourly: &["weathercode", "weather_code"],
    fallback: Fallback::Zero,
};

/// Value at `index` of the first candidate array that has a number there.
///
/// A key whose container is not an array, whose index is out of range, or
/// whose element is `null`/non-numeric does not count; the next key is tried.
pub fn resolve(hourly: &Value, keys: &[&str], index: Option<usize>) -> Option<f64> {
    let index = index?;
    keys.iter().find_map(|key| {
        hourly
            .get(*key)
            .and_then(Value::as_array)
            .and_then(|series| series.get(index))
            .and_then(Value::as_f64)
    })
}

/// First candidate key in a point-in-time section holding a number
pub fn resolve_current(current: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| current.get(*key).and_then(Value::as_f64))
}

impl FieldSpec {
    /// Current section first, then the hourly arrays at the aligned index.
    /// Absent when neither has a value; fallbacks are applied by the builder.
    pub fn lookup(&self, current: &Value, hourly: &Value, index: Option<usize>) -> Option<f64> {
        resolve_current(current, self.current).or_else(|| resolve(hourly, self.hourly, index))
    }
}
