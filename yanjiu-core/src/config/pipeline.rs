//! Tunables for the research pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Result, YanjiuError};

/// Timeouts, thresholds and defaults used by the pipeline stages.
///
/// Every LLM and backend call is bounded by one of the timeouts below. When
/// a timeout fires the stage falls back to its degraded result instead of
/// failing the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeout for planning, synthesis and reflection calls, in seconds.
    pub llm_timeout_seconds: u64,

    /// Finalization runs under `llm_timeout_seconds * finalize_timeout_multiplier`.
    pub finalize_timeout_multiplier: u32,

    /// Timeout for a single relevancy judgment, in seconds.
    pub relevancy_timeout_seconds: u64,

    /// Timeout for a single backend query, in seconds.
    pub backend_timeout_seconds: u64,

    /// Web results must score strictly above this to be used.
    pub web_score_threshold: f64,

    /// Check that artifact questions relate to the artifact before answering.
    pub apply_guardrail: bool,

    /// Queries planned by requests built with `ResearchRequest::from_config`.
    pub default_num_queries: usize,

    /// Reflection rounds for requests built with `ResearchRequest::from_config`.
    pub default_num_reflections: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm_timeout_seconds: 90,
            finalize_timeout_multiplier: 3,
            relevancy_timeout_seconds: 90,
            backend_timeout_seconds: 90,
            web_score_threshold: 0.6,
            apply_guardrail: false,
            default_num_queries: 3,
            default_num_reflections: 2,
        }
    }
}

impl PipelineConfig {
    /// Set the LLM timeout.
    #[must_use]
    pub fn with_llm_timeout(mut self, seconds: u64) -> Self {
        self.llm_timeout_seconds = seconds;
        self
    }

    /// Set the relevancy timeout.
    #[must_use]
    pub fn with_relevancy_timeout(mut self, seconds: u64) -> Self {
        self.relevancy_timeout_seconds = seconds;
        self
    }

    /// Set the backend timeout.
    #[must_use]
    pub fn with_backend_timeout(mut self, seconds: u64) -> Self {
        self.backend_timeout_seconds = seconds;
        self
    }

    /// Set the web score threshold.
    #[must_use]
    pub fn with_web_score_threshold(mut self, threshold: f64) -> Self {
        self.web_score_threshold = threshold;
        self
    }

    /// Enable or disable the artifact guardrail.
    #[must_use]
    pub fn with_guardrail(mut self, enabled: bool) -> Self {
        self.apply_guardrail = enabled;
        self
    }

    /// Timeout for planning, synthesis and reflection calls.
    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_seconds)
    }

    /// Timeout for finalization.
    #[must_use]
    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_secs(
            self.llm_timeout_seconds
                .saturating_mul(u64::from(self.finalize_timeout_multiplier)),
        )
    }

    /// Timeout for a relevancy judgment.
    #[must_use]
    pub fn relevancy_timeout(&self) -> Duration {
        Duration::from_secs(self.relevancy_timeout_seconds)
    }

    /// Timeout for a backend query.
    #[must_use]
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_seconds)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.llm_timeout_seconds == 0
            || self.relevancy_timeout_seconds == 0
            || self.backend_timeout_seconds == 0
        {
            return Err(YanjiuError::configuration(
                "Pipeline timeouts must be greater than 0",
            ));
        }
        if self.finalize_timeout_multiplier == 0 {
            return Err(YanjiuError::configuration(
                "Finalize timeout multiplier must be greater than 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.web_score_threshold) {
            return Err(YanjiuError::configuration(
                "Web score threshold must be between 0.0 and 1.0",
            ));
        }
        if self.default_num_queries == 0 {
            return Err(YanjiuError::configuration(
                "Default number of queries must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.finalize_timeout(), Duration::from_secs(270));
        assert!((config.web_score_threshold - 0.6).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_finalize_timeout_saturates() {
        let config = PipelineConfig::default().with_llm_timeout(u64::MAX);
        assert_eq!(config.finalize_timeout(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_invalid_threshold() {
        let config = PipelineConfig::default().with_web_score_threshold(1.5);
        assert!(config.validate().is_err());
    }
}
