//! Loading research settings from JSON files and the environment.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::{EciConfig, LlmConfig, PipelineConfig, RagConfig, TavilyConfig};
use crate::{Result, YanjiuError};

static ENV_VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("env substitution regex is valid")
});

/// Everything needed to assemble a research pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchSettings {
    /// Chat model used by every stage.
    pub llm: LlmConfig,

    /// RAG backend.
    pub rag: RagConfig,

    /// Web search backend, if enabled.
    #[serde(default)]
    pub tavily: Option<TavilyConfig>,

    /// Enterprise search backend, if enabled.
    #[serde(default)]
    pub eci: Option<EciConfig>,

    /// Pipeline tunables.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl ResearchSettings {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;
        self.rag.validate()?;
        if let Some(tavily) = &self.tavily {
            tavily.validate()?;
        }
        if let Some(eci) = &self.eci {
            eci.validate()?;
        }
        self.pipeline.validate()
    }

    /// Build settings from `YANJIU_*` environment variables.
    ///
    /// Required: `YANJIU_LLM_PROVIDER`, `YANJIU_LLM_MODEL`, `YANJIU_RAG_URL`.
    /// Optional: `YANJIU_LLM_API_KEY`, `YANJIU_LLM_BASE_URL`,
    /// `YANJIU_RAG_API_KEY`, `YANJIU_TAVILY_API_KEY`, `YANJIU_ECI_ENDPOINT`
    /// together with `YANJIU_ECI_TOKEN`, and `YANJIU_APPLY_GUARDRAIL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| {
                YanjiuError::configuration(format!("Missing environment variable: {name}"))
            })
        };

        let mut llm = LlmConfig::new(
            required("YANJIU_LLM_PROVIDER")?,
            required("YANJIU_LLM_MODEL")?,
        );
        llm.api_key = lookup("YANJIU_LLM_API_KEY");
        llm.base_url = lookup("YANJIU_LLM_BASE_URL");

        let mut rag = RagConfig::new(required("YANJIU_RAG_URL")?);
        rag.api_key = lookup("YANJIU_RAG_API_KEY");

        let tavily = lookup("YANJIU_TAVILY_API_KEY").map(TavilyConfig::new);
        let eci = match (lookup("YANJIU_ECI_ENDPOINT"), lookup("YANJIU_ECI_TOKEN")) {
            (Some(endpoint), Some(token)) => Some(EciConfig::new(endpoint, token)),
            _ => None,
        };

        let pipeline = PipelineConfig::default().with_guardrail(
            lookup("YANJIU_APPLY_GUARDRAIL").is_some_and(|value| value.eq_ignore_ascii_case("true")),
        );

        let settings = Self {
            llm,
            rag,
            tavily,
            eci,
            pipeline,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Reads [`ResearchSettings`] from JSON files.
///
/// String values may reference environment variables as `${VAR}` or
/// `${VAR:default}`; references are substituted before parsing.
///
/// # Examples
///
/// ```rust,no_run
/// use yanjiu_core::config::ConfigLoader;
///
/// # async fn example() -> yanjiu_core::Result<()> {
/// let settings = ConfigLoader::new().load_json_file("research.json").await?;
/// println!("using model {}", settings.llm.model);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Create a new loader.
    pub fn new() -> Self {
        Self
    }

    /// Load and validate settings from a JSON file.
    pub async fn load_json_file<P: AsRef<Path>>(&self, file_path: P) -> Result<ResearchSettings> {
        let file_path = file_path.as_ref();
        debug!("Loading configuration file: {}", file_path.display());

        let content = tokio::fs::read_to_string(file_path).await.map_err(|e| {
            YanjiuError::configuration(format!(
                "Failed to read configuration file {}: {e}",
                file_path.display()
            ))
        })?;

        let settings = self.parse_str(&content).map_err(|e| {
            YanjiuError::configuration(format!(
                "Invalid configuration in {}: {e}",
                file_path.display()
            ))
        })?;

        info!(
            provider = %settings.llm.provider,
            model = %settings.llm.model,
            web = settings.tavily.is_some(),
            eci = settings.eci.is_some(),
            "Loaded research configuration from {}",
            file_path.display()
        );
        Ok(settings)
    }

    /// Parse and validate settings from a JSON string.
    pub fn parse_str(&self, content: &str) -> Result<ResearchSettings> {
        let content = substitute_env_variables(content, |name| std::env::var(name).ok());
        let settings: ResearchSettings = serde_json::from_str(&content)
            .map_err(|e| YanjiuError::configuration(format!("Invalid JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Substitute `${VAR}` and `${VAR:default}` references.
///
/// Unset variables without a default become empty strings.
fn substitute_env_variables<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR_REGEX
        .replace_all(content, |captures: &Captures<'_>| {
            let default_value = captures.get(2).map_or("", |m| m.as_str());
            lookup(&captures[1]).unwrap_or_else(|| default_value.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_substitution_with_defaults() {
        let lookup = lookup_from(&[("MODEL", "nemotron")]);
        let out = substitute_env_variables(
            r#"{"model": "${MODEL}", "url": "${RAG_URL:http://localhost:8081}", "key": "${KEY}"}"#,
            lookup,
        );
        assert_eq!(
            out,
            r#"{"model": "nemotron", "url": "http://localhost:8081", "key": ""}"#
        );
    }

    #[test]
    fn test_from_lookup() {
        let settings = ResearchSettings::from_lookup(lookup_from(&[
            ("YANJIU_LLM_PROVIDER", "local"),
            ("YANJIU_LLM_MODEL", "nemotron"),
            ("YANJIU_LLM_BASE_URL", "http://localhost:8000/v1"),
            ("YANJIU_RAG_URL", "http://localhost:8081/v1/"),
            ("YANJIU_TAVILY_API_KEY", "tvly-123"),
            ("YANJIU_APPLY_GUARDRAIL", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(settings.llm.model, "nemotron");
        assert!(settings.tavily.is_some());
        assert!(settings.eci.is_none());
        assert!(settings.pipeline.apply_guardrail);
    }

    #[test]
    fn test_from_lookup_missing_required() {
        let err = ResearchSettings::from_lookup(lookup_from(&[("YANJIU_LLM_PROVIDER", "local")]))
            .unwrap_err();
        assert!(err.to_string().contains("YANJIU_LLM_MODEL"));
    }
}
