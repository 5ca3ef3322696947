//! Optional activity briefs from a local language model.
//!
//! The capability starts `Unavailable` and only moves when the user asks for
//! it. Everything that reads weather keeps working no matter which state it
//! ends up in.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use weathernow_core::AdvisoryConfig;
use weathernow_forecast::{compass_label, describe_wmo_code, Place, WeatherSnapshot};

/// Generation runs on a small local model; it gets more room than weather calls.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "Be concise, helpful, and upbeat.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CapabilityState {
    #[default]
    Unavailable,
    Initializing,
    Available,
    /// Carries the reason shown next to "AI unavailable"
    Failed(String),
}

impl CapabilityState {
    pub fn is_available(&self) -> bool {
        matches!(self, CapabilityState::Available)
    }
}

impl std::fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityState::Unavailable => write!(f, "off"),
            CapabilityState::Initializing => write!(f, "initializing"),
            CapabilityState::Available => write!(f, "ready"),
            CapabilityState::Failed(reason) => write!(f, "unavailable: {}", reason),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisoryError {
    #[error("advisory engine not configured")]
    NotConfigured,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("engine returned status {0}")]
    Status(u16),
    #[error("model '{0}' is not loaded")]
    ModelMissing(String),
    #[error("engine returned an empty reply")]
    EmptyReply,
}

/// A text-generation engine that can be warmed up once and then prompted
#[async_trait]
pub trait AdvisoryBackend: Send + Sync {
    async fn initialize(&self) -> Result<(), AdvisoryError>;

    async fn generate(
        &self,
        snapshot: &WeatherSnapshot,
        place: &Place,
    ) -> Result<String, AdvisoryError>;
}

/// State machine around an optional [`AdvisoryBackend`]
pub struct AdvisoryCapability {
    backend: Option<Arc<dyn AdvisoryBackend>>,
    state: Mutex<CapabilityState>,
    /// Generations currently outstanding
    thinking: AtomicUsize,
}

/// Holds one count on `AdvisoryCapability::thinking` until dropped
struct ThinkingGuard<'a>(&'a AtomicUsize);

impl<'a> ThinkingGuard<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for ThinkingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdvisoryCapability {
    pub fn new(backend: Arc<dyn AdvisoryBackend>) -> Self {
        Self {
            backend: Some(backend),
            state: Mutex::new(CapabilityState::Unavailable),
            thinking: AtomicUsize::new(0),
        }
    }

    /// No engine on this device; initialization always fails
    pub fn unconfigured() -> Self {
        Self {
            backend: None,
            state: Mutex::new(CapabilityState::Unavailable),
            thinking: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> CapabilityState {
        self.state.lock().clone()
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().is_available()
    }

    /// True while at least one generation is outstanding
    pub fn is_thinking(&self) -> bool {
        self.thinking.load(Ordering::SeqCst) > 0
    }

    /// Bring the engine up. Idempotent: returns the current state
    /// immediately while already initializing or available. A failed engine
    /// may be retried.
    pub async fn initialize(&self) -> CapabilityState {
        if !self.begin_initialize() {
            return self.state();
        }
        self.finish_initialize().await
    }

    /// Claim the move to `Initializing`. Returns false when another caller
    /// already holds it or the engine is up; only a caller that got `true`
    /// may go on to [`finish_initialize`](Self::finish_initialize).
    pub fn begin_initialize(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(
            *state,
            CapabilityState::Initializing | CapabilityState::Available
        ) {
            return false;
        }
        *state = CapabilityState::Initializing;
        true
    }

    /// Warm the engine up and record the outcome
    pub async fn finish_initialize(&self) -> CapabilityState {
        let outcome = match &self.backend {
            Some(backend) => backend.initialize().await,
            None => Err(AdvisoryError::NotConfigured),
        };

        let next = match outcome {
            Ok(()) => {
                tracing::info!("Advisory engine ready");
                CapabilityState::Available
            }
            Err(e) => {
                tracing::warn!("Advisory engine failed to initialize: {}", e);
                CapabilityState::Failed(e.to_string())
            }
        };
        *self.state.lock() = next.clone();
        next
    }

    /// Generate a brief for the given reading. `None` unless the engine is
    /// available and produced non-empty text.
    pub async fn generate(&self, snapshot: &WeatherSnapshot, place: &Place) -> Option<String> {
        if !self.is_available() {
            return None;
        }
        let backend = self.backend.as_ref()?;

        let result = {
            let _thinking = ThinkingGuard::enter(&self.thinking);
            backend.generate(snapshot, place).await
        };

        match result {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                tracing::warn!("Advisory generation failed for {}: {}", place.name, e);
                None
            }
        }
    }
}

/// User prompt describing the reading in the snapshot's own units
pub fn advisory_prompt(snapshot: &WeatherSnapshot, place: &Place) -> String {
    let temp = snapshot.units.temperature.label();
    let wind = snapshot.units.wind_speed.label();
    let city = match place.subtitle() {
        subtitle if subtitle.is_empty() => place.name.clone(),
        subtitle => format!("{}, {}", place.name, subtitle),
    };

    format!(
        "You are an outdoors guide. Given current weather, craft a concise, friendly brief \
         for an outdoor enthusiast. Include: (1) one-line summary, (2) suggested activities (3-5), \
         (3) safety + packing tips (bullets), and (4) a go/no-go indicator (with emoji).\n\n\
         City: {city}\n\
         Temp: {t}{temp} (feels like {at}{temp})\n\
         Humidity: {h}%\n\
         Wind: {ws} {wind} (gusts {wg} {wind}) from {dir}\n\
         Clouds: {cc}%\n\
         Precip: {p} mm (rain {r} mm, showers {s} mm, snow {sn} cm)\n\
         Condition: {cond}.\n\n\
         Keep it under 120 words, crisp bullets for tips.",
        t = snapshot.temperature,
        at = snapshot.apparent_temperature,
        h = snapshot.relative_humidity,
        ws = snapshot.wind_speed,
        wg = snapshot.wind_gusts,
        dir = compass_label(snapshot.wind_direction),
        cc = snapshot.cloud_cover,
        p = snapshot.precipitation,
        r = snapshot.rain,
        s = snapshot.showers,
        sn = snapshot.snowfall,
        cond = describe_wmo_code(snapshot.weather_code),
    )
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Local inference server speaking the OpenAI chat completions protocol
/// (llama.cpp server, Ollama, LM Studio and friends).
#[derive(Debug, Clone)]
pub struct ChatCompletionsBackend {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsBackend {
    pub fn new(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        let client = Client::builder().timeout(GENERATION_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl AdvisoryBackend for ChatCompletionsBackend {
    #[instrument(skip(self), fields(model = %self.model), level = "debug")]
    async fn initialize(&self) -> Result<(), AdvisoryError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.endpoint))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Status(response.status().as_u16()));
        }

        let models: ModelList = response.json().await?;
        if models.data.iter().any(|m| m.id == self.model) {
            Ok(())
        } else {
            Err(AdvisoryError::ModelMissing(self.model.clone()))
        }
    }

    #[instrument(skip(self, snapshot, place), fields(place = %place.name), level = "debug")]
    async fn generate(
        &self,
        snapshot: &WeatherSnapshot,
        place: &Place,
    ) -> Result<String, AdvisoryError> {
        let prompt = advisory_prompt(snapshot, place);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdvisoryError::Status(response.status().as_u16()));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AdvisoryError::EmptyReply)
    }
}
