//! Debounced place search.
//!
//! Every keystroke restarts the quiet period. Once it elapses a lookup is
//! issued with the next sequence number, and a response is only shown if no
//! newer lookup was issued (or the query cleared) while it was in flight.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use weathernow_core::SearchConfig;
use weathernow_forecast::{Place, PlaceSearch};

use crate::events::{EventSink, SessionEvent};

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub min_query_chars: usize,
    pub result_count: u32,
    pub language: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            min_query_chars: config.min_query_chars,
            result_count: config.result_count,
            language: config.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    /// Waiting out the quiet period after the last keystroke
    Debouncing,
    /// A lookup is in flight
    Searching,
    Results,
}

#[derive(Debug, Default)]
struct SearchState {
    /// Highest sequence number issued or retired
    sequence: u64,
    pending: Option<CancellationToken>,
    places: Vec<Place>,
    phase: SearchPhase,
}

#[derive(Clone)]
pub struct SearchCoordinator {
    geocoder: Arc<dyn PlaceSearch>,
    settings: Arc<SearchSettings>,
    state: Arc<Mutex<SearchState>>,
    runtime: Handle,
    events: EventSink,
}

impl SearchCoordinator {
    pub fn new(
        geocoder: Arc<dyn PlaceSearch>,
        settings: SearchSettings,
        runtime: Handle,
        events: EventSink,
    ) -> Self {
        Self {
            geocoder,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(SearchState::default())),
            runtime,
            events,
        }
    }

    /// Record new query text. Short queries clear the results right away;
    /// anything else schedules a lookup after the debounce window.
    pub fn set_query(&self, query: &str) {
        let query = query.trim().to_string();

        if query.chars().count() < self.settings.min_query_chars {
            self.retire();
            return;
        }

        let token = CancellationToken::new();
        {
            let mut state = self.state.lock();
            if let Some(previous) = state.pending.replace(token.clone()) {
                previous.cancel();
            }
            state.phase = SearchPhase::Debouncing;
        }

        let this = self.clone();
        self.runtime.spawn(async move {
            let superseded = tokio::select! {
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(this.settings.debounce) => false,
            };
            if superseded {
                tracing::trace!("Debounce for '{}' superseded", query);
                return;
            }
            this.run_lookup(query, token).await;
        });
    }

    /// Drop pending work and results. Any lookup still in flight will be
    /// ignored when it returns.
    pub fn retire(&self) {
        let had_places = {
            let mut state = self.state.lock();
            if let Some(pending) = state.pending.take() {
                pending.cancel();
            }
            state.sequence += 1;
            state.phase = SearchPhase::Idle;
            !std::mem::take(&mut state.places).is_empty()
        };

        if had_places {
            self.events.emit(SessionEvent::PlacesUpdated(Vec::new()));
        }
    }

    pub fn places(&self) -> Vec<Place> {
        self.state.lock().places.clone()
    }

    pub fn place(&self, index: usize) -> Option<Place> {
        self.state.lock().places.get(index).cloned()
    }

    pub fn phase(&self) -> SearchPhase {
        self.state.lock().phase
    }

    async fn run_lookup(&self, query: String, token: CancellationToken) {
        let tag = {
            let mut state = self.state.lock();
            // a keystroke may have landed between the timer firing and here
            if token.is_cancelled() {
                return;
            }
            state.pending = None;
            state.sequence += 1;
            state.phase = SearchPhase::Searching;
            state.sequence
        };

        tracing::debug!("Searching places for '{}' (#{})", query, tag);
        self.events.emit(SessionEvent::SearchStarted {
            query: query.clone(),
        });

        let result = self
            .geocoder
            .search(&query, self.settings.result_count, &self.settings.language)
            .await;

        let mut state = self.state.lock();
        if state.sequence != tag {
            tracing::debug!(
                "Dropping stale results for '{}' (#{} superseded by #{})",
                query,
                tag,
                state.sequence
            );
            return;
        }

        // a newer keystroke may already be waiting out its quiet period
        let debouncing = state.pending.is_some();
        match result {
            Ok(places) => {
                state.places = places.clone();
                state.phase = if debouncing {
                    SearchPhase::Debouncing
                } else {
                    SearchPhase::Results
                };
                drop(state);
                self.events.emit(SessionEvent::PlacesUpdated(places));
            }
            Err(e) => {
                let err = e.into_search_error();
                tracing::warn!("Place search for '{}' failed: {}", query, err);
                state.phase = if debouncing {
                    SearchPhase::Debouncing
                } else if state.places.is_empty() {
                    SearchPhase::Idle
                } else {
                    SearchPhase::Results
                };
            }
        }
    }
}
