//! Wiring pipelines from settings.

use yanjiu_core::prelude::*;
use yanjiu_integrations::prelude::*;

fn settings() -> ResearchSettings {
    ConfigLoader::new()
        .parse_str(
            r#"{
                "llm": {"provider": "local", "model": "nemotron", "base_url": "http://localhost:8000/v1"},
                "rag": {"base_url": "http://localhost:8081/v1/"},
                "tavily": {"api_key": "tvly-key"}
            }"#,
        )
        .unwrap()
}

#[test]
fn test_settings_parse_backends() {
    let settings = settings();
    assert!(settings.tavily.is_some());
    assert!(settings.eci.is_none());
    assert!(HttpRagBackend::new(&settings.rag).is_ok());
    assert!(TavilySearch::new(settings.tavily.clone().unwrap()).is_ok());
}

#[tokio::test]
async fn test_invalid_settings_are_rejected_before_connecting() {
    let mut settings = settings();
    settings.tavily = Some(TavilyConfig::new(""));

    let err = pipeline_from_settings(&settings).await.unwrap_err();
    assert!(matches!(err, YanjiuError::Configuration { .. }));
}

#[tokio::test]
async fn test_unknown_provider_is_rejected() {
    let mut settings = settings();
    settings.llm = LlmConfig::new("mystery", "model").with_api_key("key");

    let err = builder_from_settings(&settings).await.unwrap_err();
    assert!(err.to_string().contains("mystery"));
}
