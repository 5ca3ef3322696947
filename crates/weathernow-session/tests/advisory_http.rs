//! Chat-completions advisory backend against a mock inference server.

use serde_json::json;
use weathernow_core::AdvisoryConfig;
use weathernow_forecast::{MeasurementUnits, Place, WeatherSnapshot};
use weathernow_session::{
    AdvisoryBackend, AdvisoryCapability, AdvisoryError, CapabilityState, ChatCompletionsBackend,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> ChatCompletionsBackend {
    let config = AdvisoryConfig {
        enabled: true,
        endpoint: format!("{}/", server.uri()),
        model: "tiny-chat".to_string(),
        ..AdvisoryConfig::default()
    };
    ChatCompletionsBackend::new(&config).unwrap()
}

fn boulder() -> Place {
    Place {
        id: 5574991,
        name: "Boulder".to_string(),
        country: "United States".to_string(),
        region: Some("Colorado".to_string()),
        latitude: 40.01,
        longitude: -105.27,
    }
}

fn sunny() -> WeatherSnapshot {
    let mut snapshot = WeatherSnapshot::empty(MeasurementUnits::default());
    snapshot.temperature = 21.0;
    snapshot.apparent_temperature = 20.0;
    snapshot.weather_code = 1;
    snapshot
}

async fn mount_models(server: &MockServer, ids: &[&str]) {
    let data: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_initialize_requires_configured_model() {
    let server = MockServer::start().await;
    mount_models(&server, &["other-model"]).await;

    let result = backend_for(&server).initialize().await;
    assert!(matches!(result, Err(AdvisoryError::ModelMissing(m)) if m == "tiny-chat"));
}

#[tokio::test]
async fn test_initialize_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let capability = AdvisoryCapability::new(std::sync::Arc::new(backend_for(&server)));
    let state = capability.initialize().await;
    assert_eq!(
        state,
        CapabilityState::Failed("engine returned status 500".to_string())
    );
}

#[tokio::test]
async fn test_generate_sends_prompt_and_trims_reply() {
    let server = MockServer::start().await;
    mount_models(&server, &["tiny-chat"]).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "tiny-chat",
            "max_tokens": 220
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "\n☀️ Go: hike the Flatirons.\n" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let capability = AdvisoryCapability::new(std::sync::Arc::new(backend_for(&server)));
    assert_eq!(capability.initialize().await, CapabilityState::Available);

    let brief = capability.generate(&sunny(), &boulder()).await;
    assert_eq!(brief.as_deref(), Some("☀️ Go: hike the Flatirons."));
}

#[tokio::test]
async fn test_empty_choices_is_empty_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = backend_for(&server).generate(&sunny(), &boulder()).await;
    assert!(matches!(result, Err(AdvisoryError::EmptyReply)));
}
