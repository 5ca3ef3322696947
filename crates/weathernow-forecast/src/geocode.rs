//! Place search: free text to candidate places.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::types::{next_local_place_id, FetchError, Place};

/// Anything that can turn a query into candidate places
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn search(&self, name: &str, count: u32, language: &str)
        -> Result<Vec<Place>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    id: Option<i64>,
    name: String,
    country: Option<String>,
    admin1: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl From<GeocodingResult> for Place {
    fn from(r: GeocodingResult) -> Self {
        Place {
            id: r.id.unwrap_or_else(next_local_place_id),
            name: r.name,
            country: r.country.unwrap_or_default(),
            region: r.admin1,
            latitude: r.latitude,
            longitude: r.longitude,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    base_url: String,
}

impl GeocodingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PlaceSearch for GeocodingClient {
    #[instrument(skip(self), level = "debug")]
    async fn search(
        &self,
        name: &str,
        count: u32,
        language: &str,
    ) -> Result<Vec<Place>, FetchError> {
        let count = count.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("name", name),
                ("count", count.as_str()),
                ("language", language),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let parsed: GeocodingResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let places: Vec<Place> = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .map(Place::from)
            .collect();

        tracing::debug!("Geocoding '{}' returned {} places", name, places.len());
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_id_gets_local_placeholder() {
        let a: Place = serde_json::from_str::<GeocodingResult>(
            r#"{"name":"Pune","latitude":18.52,"longitude":73.85}"#,
        )
        .map(Place::from)
        .unwrap();
        let b: Place = serde_json::from_str::<GeocodingResult>(
            r#"{"name":"Pune","latitude":18.52,"longitude":73.85}"#,
        )
        .map(Place::from)
        .unwrap();

        assert!(a.id < 0);
        assert_ne!(a.id, b.id);
        assert_eq!(a.country, "");
        assert!(a.region.is_none());
    }

    #[test]
    fn test_upstream_id_is_kept() {
        let place: Place = serde_json::from_str::<GeocodingResult>(
            r#"{"id":5419384,"name":"Denver","country":"United States","admin1":"Colorado","latitude":39.74,"longitude":-104.98}"#,
        )
        .map(Place::from)
        .unwrap();

        assert_eq!(place.id, 5419384);
        assert_eq!(place.region.as_deref(), Some("Colorado"));
        assert_eq!(place.label(), "Denver, Colorado");
    }

    #[test]
    fn test_no_results_key_is_empty() {
        let parsed: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.4}"#).unwrap();
        assert!(parsed.results.is_none());
    }
}
