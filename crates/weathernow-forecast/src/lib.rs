//! Weather data for Weather Now
//!
//! Open-Meteo geocoding and forecast clients, plus the normalization that
//! turns loosely-typed forecast payloads into a complete [`WeatherSnapshot`].

pub mod compass;
mod error_mapping;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod resolver;
pub mod snapshot;
pub mod types;

pub use compass::{compass_label, compass_label_json, UNKNOWN_DIRECTION};
pub use geocode::{GeocodingClient, PlaceSearch};
pub use location::{FixedPosition, LocationProvider, Unsupported};
pub use provider::{ForecastClient, ForecastSource};
pub use snapshot::{build as build_snapshot, RawForecastPayload};
pub use types::*;
