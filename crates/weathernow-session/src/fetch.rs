//! Forecast fetching for the selected place.
//!
//! The latest (place, units) pair wins: a response is applied only if its
//! pair is still the selected one when it arrives. Starting a fetch clears
//! the activity brief straight away, and a brief is only requested once the
//! new snapshot is in place.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use weathernow_forecast::{build_snapshot, ForecastSource, MeasurementUnits, Place, WeatherSnapshot};

use crate::advisory::AdvisoryCapability;
use crate::events::{EventSink, SessionEvent};

/// Identity of a forecast request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FetchKey {
    place_id: i64,
    units: MeasurementUnits,
}

#[derive(Debug, Default)]
struct FetchState {
    place: Option<Place>,
    units: MeasurementUnits,
    snapshot: Option<WeatherSnapshot>,
    /// Tag of the most recently started fetch
    latest_fetch: u64,
    in_flight: bool,
    advisory: String,
    /// Bumped whenever the brief is cleared; stale briefs are dropped
    advisory_generation: u64,
}

impl FetchState {
    fn key(&self) -> Option<FetchKey> {
        self.place.as_ref().map(|place| FetchKey {
            place_id: place.id,
            units: self.units,
        })
    }
}

#[derive(Clone)]
pub struct FetchCoordinator {
    source: Arc<dyn ForecastSource>,
    advisory: Arc<AdvisoryCapability>,
    state: Arc<Mutex<FetchState>>,
    runtime: Handle,
    events: EventSink,
}

impl FetchCoordinator {
    pub fn new(
        source: Arc<dyn ForecastSource>,
        advisory: Arc<AdvisoryCapability>,
        units: MeasurementUnits,
        runtime: Handle,
        events: EventSink,
    ) -> Self {
        Self {
            source,
            advisory,
            state: Arc::new(Mutex::new(FetchState {
                units,
                ..FetchState::default()
            })),
            runtime,
            events,
        }
    }

    /// Select a place and fetch its forecast. Returns false (and does
    /// nothing) when the place is already selected.
    pub fn select_place(&self, place: Place) -> bool {
        let mut state = self.state.lock();
        if state.place.as_ref().map(|p| p.id) == Some(place.id) {
            return false;
        }
        state.place = Some(place);
        self.start_fetch(state);
        true
    }

    /// Change units and refetch for the selected place, if any. Returns
    /// false when the units are unchanged.
    pub fn set_units(&self, units: MeasurementUnits) -> bool {
        let mut state = self.state.lock();
        if state.units == units {
            return false;
        }
        state.units = units;
        self.start_fetch(state);
        true
    }

    pub fn toggle_temperature_unit(&self) -> MeasurementUnits {
        let units = self.units().with_temperature_toggled();
        self.set_units(units);
        units
    }

    pub fn cycle_wind_unit(&self) -> MeasurementUnits {
        let units = self.units().with_wind_cycled();
        self.set_units(units);
        units
    }

    pub fn units(&self) -> MeasurementUnits {
        self.state.lock().units
    }

    pub fn selected_place(&self) -> Option<Place> {
        self.state.lock().place.clone()
    }

    pub fn snapshot(&self) -> Option<WeatherSnapshot> {
        self.state.lock().snapshot.clone()
    }

    pub fn advisory_text(&self) -> String {
        self.state.lock().advisory.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Ask for a brief on the snapshot already shown, e.g. right after the
    /// advisory engine came up. No-op without a snapshot or engine.
    pub fn request_advisory(&self) {
        let (snapshot, place, generation) = {
            let state = self.state.lock();
            match (&state.snapshot, &state.place) {
                (Some(snapshot), Some(place)) if !state.in_flight => {
                    (snapshot.clone(), place.clone(), state.advisory_generation)
                }
                _ => return,
            }
        };
        self.spawn_advisory(snapshot, place, generation);
    }

    /// Consumes the guard so the lock is released before anything is spawned
    fn start_fetch(&self, mut state: parking_lot::MutexGuard<'_, FetchState>) {
        let Some(place) = state.place.clone() else {
            return;
        };
        let Some(key) = state.key() else {
            return;
        };

        state.latest_fetch += 1;
        state.in_flight = true;
        state.advisory.clear();
        state.advisory_generation += 1;
        let tag = state.latest_fetch;
        drop(state);

        tracing::info!(
            "Fetching forecast for {} ({}, {}) #{}",
            place.name,
            key.units.temperature.as_param(),
            key.units.wind_speed.as_param(),
            tag
        );
        self.events.emit(SessionEvent::AdvisoryCleared);
        self.events.emit(SessionEvent::FetchStarted {
            place: place.clone(),
            units: key.units,
        });

        let this = self.clone();
        self.runtime.spawn(async move {
            this.run_fetch(place, key, tag).await;
        });
    }

    async fn run_fetch(&self, place: Place, key: FetchKey, tag: u64) {
        let result = self
            .source
            .forecast(place.latitude, place.longitude, key.units)
            .await;

        let mut state = self.state.lock();
        if state.latest_fetch == tag {
            state.in_flight = false;
        }
        if state.key() != Some(key) {
            tracing::debug!("Dropping superseded forecast for {} #{}", place.name, tag);
            return;
        }

        match result {
            Ok(payload) => {
                let snapshot = build_snapshot(&payload, key.units);
                if snapshot.is_all_default() {
                    tracing::warn!("Forecast for {} carried no usable readings", place.name);
                }
                state.snapshot = Some(snapshot.clone());
                let generation = state.advisory_generation;
                drop(state);

                self.events.emit(SessionEvent::SnapshotUpdated {
                    place: place.clone(),
                    snapshot: snapshot.clone(),
                });
                self.spawn_advisory(snapshot, place, generation);
            }
            Err(e) => {
                drop(state);
                let err = e.into_forecast_error();
                tracing::warn!("Forecast for {} failed: {}", place.name, err);
                self.events.emit(SessionEvent::FetchFailed {
                    message: err.user_message().to_string(),
                });
            }
        }
    }

    fn spawn_advisory(&self, snapshot: WeatherSnapshot, place: Place, generation: u64) {
        if !self.advisory.is_available() {
            return;
        }

        let this = self.clone();
        self.runtime.spawn(async move {
            this.events.emit(SessionEvent::AdvisoryThinking(true));
            let reply = this.advisory.generate(&snapshot, &place).await;
            this.events
                .emit(SessionEvent::AdvisoryThinking(this.advisory.is_thinking()));
            let Some(text) = reply else {
                return;
            };

            let mut state = this.state.lock();
            if state.advisory_generation != generation {
                tracing::debug!("Dropping stale brief for {}", place.name);
                return;
            }
            state.advisory = text.clone();
            drop(state);
            this.events.emit(SessionEvent::AdvisoryUpdated(text));
        });
    }
}
