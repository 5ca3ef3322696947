//! One user's weather session: search box, selected place, units and the
//! optional activity brief, wired to their collaborators.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use weathernow_core::{AppError, Config};
use weathernow_forecast::{
    Coordinates, FixedPosition, ForecastClient, ForecastSource, GeocodingClient, LocationError,
    LocationProvider, MeasurementUnits, Place, PlaceSearch, Unsupported, WeatherSnapshot,
};

use crate::advisory::{AdvisoryBackend, AdvisoryCapability, CapabilityState, ChatCompletionsBackend};
use crate::events::{EventReceiver, EventSink, SessionEvent};
use crate::fetch::FetchCoordinator;
use crate::search::{SearchCoordinator, SearchPhase, SearchSettings};

/// How long a device position fix may take before "My Location" gives up
const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// External services a session talks to
pub struct Collaborators {
    pub geocoder: Arc<dyn PlaceSearch>,
    pub forecast: Arc<dyn ForecastSource>,
    pub location: Arc<dyn LocationProvider>,
    /// `None` when no advisory engine is installed
    pub advisory: Option<Arc<dyn AdvisoryBackend>>,
}

impl Collaborators {
    /// Open-Meteo clients plus whatever location and advisory support the
    /// configuration provides.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.weather.request_timeout_secs);
        let geocoder = GeocodingClient::new(&config.endpoints.geocoding_url, timeout)?;
        let forecast = ForecastClient::new(&config.endpoints.forecast_url, timeout)?;

        let location: Arc<dyn LocationProvider> = match config.weather.home_coordinates() {
            Some((latitude, longitude)) => Arc::new(FixedPosition(Coordinates {
                latitude,
                longitude,
            })),
            None => Arc::new(Unsupported),
        };

        let advisory: Option<Arc<dyn AdvisoryBackend>> = if config.advisory.enabled {
            Some(Arc::new(ChatCompletionsBackend::new(&config.advisory)?))
        } else {
            None
        };

        Ok(Self {
            geocoder: Arc::new(geocoder),
            forecast: Arc::new(forecast),
            location,
            advisory,
        })
    }
}

pub struct WeatherSession {
    search: SearchCoordinator,
    fetch: FetchCoordinator,
    advisory: Arc<AdvisoryCapability>,
    location: Arc<dyn LocationProvider>,
    events: EventSink,
    runtime: Handle,
}

impl WeatherSession {
    pub fn new(
        collaborators: Collaborators,
        search: SearchSettings,
        units: MeasurementUnits,
        runtime: Handle,
    ) -> (Self, EventReceiver) {
        let (events, rx) = EventSink::channel();
        let advisory = Arc::new(match collaborators.advisory {
            Some(backend) => AdvisoryCapability::new(backend),
            None => AdvisoryCapability::unconfigured(),
        });

        let session = Self {
            search: SearchCoordinator::new(
                collaborators.geocoder,
                search,
                runtime.clone(),
                events.clone(),
            ),
            fetch: FetchCoordinator::new(
                collaborators.forecast,
                advisory.clone(),
                units,
                runtime.clone(),
                events.clone(),
            ),
            advisory,
            location: collaborators.location,
            events,
            runtime,
        };
        (session, rx)
    }

    pub fn from_config(config: &Config, runtime: Handle) -> Result<(Self, EventReceiver), AppError> {
        let collaborators = Collaborators::from_config(config)?;
        let units = MeasurementUnits::new(
            config.weather.temperature_unit,
            config.weather.wind_speed_unit,
        );
        Ok(Self::new(
            collaborators,
            SearchSettings::from(&config.search),
            units,
            runtime,
        ))
    }

    pub fn set_query(&self, query: &str) {
        self.search.set_query(query);
    }

    pub fn places(&self) -> Vec<Place> {
        self.search.places()
    }

    pub fn search_phase(&self) -> SearchPhase {
        self.search.phase()
    }

    /// Pick the place at `index` in the current results
    pub fn select(&self, index: usize) -> Option<Place> {
        let place = self.search.place(index)?;
        self.select_place(place.clone());
        Some(place)
    }

    /// Submit: pick the first result, if any
    pub fn select_first(&self) -> Option<Place> {
        self.select(0)
    }

    /// Select a place and close the result list
    pub fn select_place(&self, place: Place) {
        self.search.retire();
        self.fetch.select_place(place);
    }

    /// Select the device position as a synthetic "My Location" place
    pub async fn use_my_location(&self) -> Result<Place, LocationError> {
        if !self.location.is_available() {
            return Err(LocationError::Unsupported);
        }

        let position = tokio::time::timeout(LOCATION_TIMEOUT, self.location.current_position())
            .await
            .unwrap_or(Err(LocationError::Timeout))
            .map_err(|e| {
                tracing::warn!("Location lookup failed: {}", e);
                e
            })?;
        let place = Place::my_location(position);
        self.select_place(place.clone());
        Ok(place)
    }

    pub fn toggle_temperature_unit(&self) -> MeasurementUnits {
        self.fetch.toggle_temperature_unit()
    }

    pub fn cycle_wind_unit(&self) -> MeasurementUnits {
        self.fetch.cycle_wind_unit()
    }

    pub fn set_units(&self, units: MeasurementUnits) {
        self.fetch.set_units(units);
    }

    pub fn units(&self) -> MeasurementUnits {
        self.fetch.units()
    }

    /// Start the advisory engine in the background. Once it is up, a brief
    /// is generated for the reading already on screen.
    pub fn enable_advisory(&self) {
        // claimed synchronously so a second call before the task runs is a no-op
        if !self.advisory.begin_initialize() {
            return;
        }
        self.events.emit(SessionEvent::AdvisoryStatusChanged(
            CapabilityState::Initializing,
        ));

        let advisory = self.advisory.clone();
        let fetch = self.fetch.clone();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let state = advisory.finish_initialize().await;
            let available = state.is_available();
            events.emit(SessionEvent::AdvisoryStatusChanged(state));
            if available {
                fetch.request_advisory();
            }
        });
    }

    pub fn selected_place(&self) -> Option<Place> {
        self.fetch.selected_place()
    }

    pub fn snapshot(&self) -> Option<WeatherSnapshot> {
        self.fetch.snapshot()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch.is_fetching()
    }

    /// Current brief; empty when there is none
    pub fn advisory(&self) -> String {
        self.fetch.advisory_text()
    }

    pub fn advisory_state(&self) -> CapabilityState {
        self.advisory.state()
    }

    pub fn is_advisory_thinking(&self) -> bool {
        self.advisory.is_thinking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::AdvisoryError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weathernow_forecast::{FetchError, RawForecastPayload, TemperatureUnit};

    struct OneCity;

    #[async_trait]
    impl PlaceSearch for OneCity {
        async fn search(
            &self,
            name: &str,
            _count: u32,
            _language: &str,
        ) -> Result<Vec<Place>, FetchError> {
            Ok(vec![Place {
                id: 2643743,
                name: name.to_string(),
                country: "United Kingdom".to_string(),
                region: Some("England".to_string()),
                latitude: 51.51,
                longitude: -0.13,
            }])
        }
    }

    struct Drizzle;

    #[async_trait]
    impl ForecastSource for Drizzle {
        async fn forecast(
            &self,
            _latitude: f64,
            _longitude: f64,
            units: MeasurementUnits,
        ) -> Result<RawForecastPayload, FetchError> {
            let temperature = match units.temperature {
                TemperatureUnit::Celsius => 15.0,
                TemperatureUnit::Fahrenheit => 59.0,
            };
            Ok(RawForecastPayload(json!({
                "current_weather": { "time": "t0", "temperature": temperature, "weathercode": 51 },
                "hourly": { "time": ["t0"], "relativehumidity_2m": [88] }
            })))
        }
    }

    struct Cheerful {
        init_calls: AtomicUsize,
    }

    impl Cheerful {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                init_calls: AtomicUsize::new(0),
            })
        }
    }

    /// Never produces a position fix
    struct Stalled;

    #[async_trait]
    impl LocationProvider for Stalled {
        async fn current_position(&self) -> Result<Coordinates, LocationError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl AdvisoryBackend for Cheerful {
        async fn initialize(&self) -> Result<(), AdvisoryError> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn generate(
            &self,
            _snapshot: &WeatherSnapshot,
            place: &Place,
        ) -> Result<String, AdvisoryError> {
            Ok(format!("Bring a jacket in {}", place.name))
        }
    }

    fn session(
        location: Arc<dyn LocationProvider>,
        advisory: Option<Arc<dyn AdvisoryBackend>>,
    ) -> (WeatherSession, EventReceiver) {
        WeatherSession::new(
            Collaborators {
                geocoder: Arc::new(OneCity),
                forecast: Arc::new(Drizzle),
                location,
                advisory,
            },
            SearchSettings::default(),
            MeasurementUnits::default(),
            Handle::current(),
        )
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_select_and_read() {
        let (session, _rx) = session(Arc::new(Unsupported), None);

        session.set_query("London");
        advance(400).await;
        assert_eq!(session.places().len(), 1);

        let picked = session.select_first().unwrap();
        assert_eq!(picked.label(), "London, England");
        assert!(session.places().is_empty());
        assert_eq!(session.search_phase(), SearchPhase::Idle);

        advance(50).await;
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.temperature, 15.0);
        assert_eq!(snapshot.relative_humidity, 88.0);

        session.toggle_temperature_unit();
        advance(50).await;
        assert_eq!(session.snapshot().unwrap().temperature, 59.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_with_no_results_does_nothing() {
        let (session, _rx) = session(Arc::new(Unsupported), None);
        assert!(session.select_first().is_none());
        assert!(session.selected_place().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_my_location_unavailable() {
        let (session, _rx) = session(Arc::new(Unsupported), None);
        assert!(matches!(
            session.use_my_location().await,
            Err(LocationError::Unsupported)
        ));
        assert!(session.selected_place().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_my_location_selects_synthetic_place() {
        let here = Coordinates {
            latitude: 40.0,
            longitude: -105.0,
        };
        let (session, _rx) = session(Arc::new(FixedPosition(here)), None);

        let place = session.use_my_location().await.unwrap();
        assert_eq!(place.name, "My Location");
        assert!(place.id < 0);

        advance(50).await;
        assert_eq!(session.selected_place().unwrap().id, place.id);
        assert!(session.snapshot().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabling_advisory_briefs_current_reading() {
        let (session, mut rx) = session(Arc::new(Unsupported), Some(Cheerful::new()));
        assert_eq!(session.advisory_state(), CapabilityState::Unavailable);

        session.set_query("Leeds");
        advance(400).await;
        session.select_first();
        advance(50).await;
        assert_eq!(session.advisory(), "");

        session.enable_advisory();
        advance(50).await;
        assert_eq!(session.advisory_state(), CapabilityState::Available);
        assert_eq!(session.advisory(), "Bring a jacket in Leeds");

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::AdvisoryStatusChanged(state) = event {
                statuses.push(state);
            }
        }
        assert_eq!(
            statuses,
            vec![CapabilityState::Initializing, CapabilityState::Available]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabling_advisory_twice_warms_up_once() {
        let engine = Cheerful::new();
        let (session, mut rx) = session(Arc::new(Unsupported), Some(engine.clone()));

        session.set_query("Leeds");
        advance(400).await;
        session.select_first();
        advance(50).await;

        session.enable_advisory();
        session.enable_advisory();
        assert!(!session.is_advisory_thinking());
        advance(50).await;

        assert_eq!(engine.init_calls.load(Ordering::SeqCst), 1);
        let mut statuses = Vec::new();
        let mut briefs = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                SessionEvent::AdvisoryStatusChanged(state) => statuses.push(state),
                SessionEvent::AdvisoryUpdated(_) => briefs += 1,
                _ => {}
            }
        }
        assert_eq!(
            statuses,
            vec![CapabilityState::Initializing, CapabilityState::Available]
        );
        assert_eq!(briefs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_my_location_times_out() {
        let (session, _rx) = session(Arc::new(Stalled), None);
        let started = tokio::time::Instant::now();

        assert!(matches!(
            session.use_my_location().await,
            Err(LocationError::Timeout)
        ));
        assert!(started.elapsed() >= LOCATION_TIMEOUT);
        assert!(session.selected_place().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_advisory_without_engine_fails_softly() {
        let (session, _rx) = session(Arc::new(Unsupported), None);
        session.enable_advisory();
        advance(10).await;
        assert!(matches!(
            session.advisory_state(),
            CapabilityState::Failed(_)
        ));

        session.set_query("York");
        advance(400).await;
        session.select_first();
        advance(50).await;
        assert!(session.snapshot().is_some());
        assert_eq!(session.advisory(), "");
    }
}
