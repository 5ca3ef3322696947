//! Messages sent from background tasks to whoever renders the session.

use tokio::sync::mpsc;

use weathernow_forecast::{MeasurementUnits, Place, WeatherSnapshot};

use crate::advisory::CapabilityState;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A geocoding lookup was issued after the debounce window
    SearchStarted { query: String },
    /// The visible place list changed (possibly to empty)
    PlacesUpdated(Vec<Place>),
    FetchStarted {
        place: Place,
        units: MeasurementUnits,
    },
    SnapshotUpdated {
        place: Place,
        snapshot: WeatherSnapshot,
    },
    /// Non-blocking; the previous snapshot is still current
    FetchFailed { message: String },
    AdvisoryStatusChanged(CapabilityState),
    AdvisoryCleared,
    /// Whether any brief is still being generated; sent when one starts
    /// and again whenever one ends
    AdvisoryThinking(bool),
    AdvisoryUpdated(String),
}

pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Cloneable sending half. Sends never block and are dropped silently once
/// the receiver is gone.
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<mpsc::UnboundedSender<SessionEvent>>);

impl EventSink {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(Some(tx)), rx)
    }

    /// Sink that discards everything
    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}
