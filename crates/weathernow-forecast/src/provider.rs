use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

use crate::snapshot::RawForecastPayload;
use crate::types::{FetchError, MeasurementUnits};

/// Hourly variables requested alongside `current_weather` so readings the
/// current block lacks can be picked from the matching hour.
pub const HOURLY_VARIABLES: &str =
    "relativehumidity_2m,apparent_temperature,cloudcover,precipitation,windgusts_10m,showers,snowfall";

/// Source of raw forecast payloads for a coordinate pair
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        units: MeasurementUnits,
    ) -> Result<RawForecastPayload, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ForecastSource for ForecastClient {
    #[instrument(skip(self), level = "debug")]
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        units: MeasurementUnits,
    ) -> Result<RawForecastPayload, FetchError> {
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current_weather", "true"),
                ("hourly", HOURLY_VARIABLES),
                ("timezone", "auto"),
                ("temperature_unit", units.temperature.as_param()),
                // Open-Meteo expects windspeed_unit, not wind_speed_unit
                ("windspeed_unit", units.wind_speed.as_param()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let payload = serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(RawForecastPayload(payload))
    }
}
