//! Session orchestration for Weather Now
//!
//! Debounced place search, latest-wins forecast fetching and the optional
//! advisory engine, reporting progress as [`SessionEvent`]s.

pub mod advisory;
mod error_mapping;
pub mod events;
pub mod fetch;
pub mod search;
pub mod session;

pub use advisory::{
    advisory_prompt, AdvisoryBackend, AdvisoryCapability, AdvisoryError, CapabilityState,
    ChatCompletionsBackend,
};
pub use events::{EventReceiver, EventSink, SessionEvent};
pub use fetch::FetchCoordinator;
pub use search::{SearchCoordinator, SearchPhase, SearchSettings};
pub use session::{Collaborators, WeatherSession};
