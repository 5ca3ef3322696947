use std::sync::atomic::{AtomicI64, Ordering};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use weathernow_core::{TemperatureUnit, WindSpeedUnit};

/// Placeholder ids count down from -1 so they never collide with upstream ids.
static NEXT_LOCAL_ID: AtomicI64 = AtomicI64::new(-1);

/// Allocate a process-unique identifier for places the upstream did not number.
pub fn next_local_place_id() -> i64 {
    NEXT_LOCAL_ID.fetch_sub(1, Ordering::Relaxed)
}

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A place the user can get weather for.
///
/// Immutable once created; the id is the place's identity for fetch
/// coordination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    /// Synthetic place for the "use my location" action
    pub fn my_location(position: Coordinates) -> Self {
        Self {
            id: next_local_place_id(),
            name: "My Location".to_string(),
            country: String::new(),
            region: None,
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// "Name, Region" as written back into the search box after selection
    pub fn label(&self) -> String {
        match self.region.as_deref().filter(|r| !r.is_empty()) {
            Some(region) => format!("{}, {}", self.name, region),
            None => self.name.clone(),
        }
    }

    /// Region and country, skipping whichever is empty
    pub fn subtitle(&self) -> String {
        [self.region.as_deref().unwrap_or_default(), self.country.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Units a forecast is requested in. Changing either half invalidates the
/// current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MeasurementUnits {
    pub temperature: TemperatureUnit,
    pub wind_speed: WindSpeedUnit,
}

impl MeasurementUnits {
    pub fn new(temperature: TemperatureUnit, wind_speed: WindSpeedUnit) -> Self {
        Self {
            temperature,
            wind_speed,
        }
    }

    pub fn with_temperature_toggled(self) -> Self {
        Self {
            temperature: self.temperature.toggled(),
            ..self
        }
    }

    pub fn with_wind_cycled(self) -> Self {
        Self {
            wind_speed: self.wind_speed.cycled(),
            ..self
        }
    }
}

/// Normalized current conditions for one place at one moment.
///
/// Every numeric field is always populated; readings the upstream did not
/// provide are zero (apparent temperature falls back to temperature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Upstream local timestamp, e.g. `2026-10-18T14:00`; empty when missing
    pub time: String,
    pub temperature: f64,
    pub apparent_temperature: f64,
    /// Percent
    pub relative_humidity: f64,
    /// mm
    pub precipitation: f64,
    /// mm
    pub rain: f64,
    /// mm
    pub showers: f64,
    /// cm
    pub snowfall: f64,
    /// Percent
    pub cloud_cover: f64,
    pub wind_speed: f64,
    pub wind_gusts: f64,
    /// Degrees in [0, 360)
    pub wind_direction: f64,
    /// WMO weather interpretation code
    pub weather_code: i32,
    pub units: MeasurementUnits,
}

impl WeatherSnapshot {
    /// Snapshot with every reading at its default
    pub fn empty(units: MeasurementUnits) -> Self {
        Self {
            time: String::new(),
            temperature: 0.0,
            apparent_temperature: 0.0,
            relative_humidity: 0.0,
            precipitation: 0.0,
            rain: 0.0,
            showers: 0.0,
            snowfall: 0.0,
            cloud_cover: 0.0,
            wind_speed: 0.0,
            wind_gusts: 0.0,
            wind_direction: 0.0,
            weather_code: 0,
            units,
        }
    }

    /// True when nothing usable came back from upstream
    pub fn is_all_default(&self) -> bool {
        *self == Self::empty(self.units)
    }

    pub fn observed_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.time, "%Y-%m-%dT%H:%M").ok()
    }
}

/// Location provider errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location is not supported on this device")]
    Unsupported,
    #[error("Location request timed out")]
    Timeout,
}

/// Errors from the geocoding and forecast collaborators
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Upstream returned status {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
}
