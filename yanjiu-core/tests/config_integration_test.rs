//! Integration tests for loading research settings.

use tempfile::TempDir;
use tokio::fs;
use yanjiu_core::config::ConfigLoader;
use yanjiu_core::YanjiuError;

#[tokio::test]
async fn test_load_full_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("research.json");

    let settings = serde_json::json!({
        "llm": {
            "provider": "local",
            "model": "nvidia/llama-3.3-nemotron-super-49b-v1",
            "base_url": "${YANJIU_TEST_UNSET_LLM_URL:http://localhost:8000/v1}",
            "stream": false
        },
        "rag": {
            "base_url": "http://localhost:8081/v1/",
            "timeout_seconds": 30
        },
        "tavily": {
            "api_key": "tvly-test",
            "include_domains": ["nvidia.com", "arxiv.org"]
        },
        "pipeline": {
            "web_score_threshold": 0.7,
            "apply_guardrail": true
        }
    });

    fs::write(&path, serde_json::to_string_pretty(&settings).unwrap())
        .await
        .unwrap();

    let loaded = ConfigLoader::new().load_json_file(&path).await.unwrap();

    assert_eq!(
        loaded.llm.base_url.as_deref(),
        Some("http://localhost:8000/v1")
    );
    assert!(!loaded.llm.stream);
    assert_eq!(loaded.rag.effective_timeout(), 30);

    let tavily = loaded.tavily.unwrap();
    assert_eq!(tavily.max_results, 2);
    assert_eq!(tavily.search_depth, "advanced");
    assert_eq!(tavily.include_domains.len(), 2);

    assert!(loaded.eci.is_none());
    assert!(loaded.pipeline.apply_guardrail);
    assert!((loaded.pipeline.web_score_threshold - 0.7).abs() < f64::EPSILON);
    assert_eq!(loaded.pipeline.default_num_reflections, 2);
}

#[tokio::test]
async fn test_missing_file_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = ConfigLoader::new()
        .load_json_file(temp_dir.path().join("absent.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, YanjiuError::Configuration { .. }));
}

#[test]
fn test_invalid_settings_rejected() {
    let loader = ConfigLoader::new();

    let bad_url = r#"{
        "llm": {"provider": "ollama", "model": "llama3.2", "base_url": "http://localhost:11434"},
        "rag": {"base_url": "localhost:8081"}
    }"#;
    assert!(matches!(
        loader.parse_str(bad_url),
        Err(YanjiuError::Configuration { .. })
    ));

    let missing_key = r#"{
        "llm": {"provider": "openai", "model": "gpt-4o"},
        "rag": {"base_url": "http://localhost:8081"}
    }"#;
    assert!(loader.parse_str(missing_key).is_err());

    assert!(loader.parse_str("{ not json").is_err());
}
