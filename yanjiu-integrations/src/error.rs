//! Error types for the concrete integrations.

use thiserror::Error;
use yanjiu_core::YanjiuError;

/// Result type alias for integration operations.
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Errors raised while talking to an LLM provider or a search service.
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Transport failure or a non-success HTTP status
    #[error("HTTP error: {message}")]
    Http {
        /// HTTP status code, if a response was received
        status_code: Option<u16>,
        /// Error message
        message: String,
    },

    /// Request timeout
    #[error("Request timeout after {seconds} seconds")]
    Timeout {
        /// Timeout duration in seconds
        seconds: u64,
    },

    /// The service answered with something we could not read
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message
        message: String,
    },

    /// Siumai library error
    #[error("Siumai error: {0}")]
    Siumai(String),
}

impl IntegrationError {
    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an HTTP error.
    pub fn http<S: Into<String>>(status_code: Option<u16>, message: S) -> Self {
        Self::Http {
            status_code,
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Convert into a core retrieval error attributed to `backend`.
    pub fn into_retrieval(self, backend: &str) -> YanjiuError {
        match self {
            Self::Configuration { message } => YanjiuError::configuration(message),
            Self::Timeout { seconds } => {
                YanjiuError::timeout(format!("{backend} request after {seconds} seconds"))
            }
            other => YanjiuError::retrieval(backend, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for IntegrationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::invalid_response(error.to_string());
        }
        Self::http(error.status().map(|s| s.as_u16()), error.to_string())
    }
}

impl From<serde_json::Error> for IntegrationError {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_response(error.to_string())
    }
}

// Convert to yanjiu core error
impl From<IntegrationError> for YanjiuError {
    fn from(error: IntegrationError) -> Self {
        match error {
            IntegrationError::Configuration { message } => Self::configuration(message),
            IntegrationError::Siumai(message) => Self::llm(format!("Siumai error: {message}")),
            IntegrationError::Timeout { seconds } => {
                Self::timeout(format!("request after {seconds} seconds"))
            }
            other => Self::external(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_retrieval() {
        let err = IntegrationError::http(Some(500), "boom").into_retrieval("rag");
        assert!(matches!(err, YanjiuError::Retrieval { ref backend, .. } if backend == "rag"));
        assert!(err.to_string().contains("boom"));

        let err: YanjiuError = IntegrationError::Siumai("no model".into()).into();
        assert!(matches!(err, YanjiuError::Llm { .. }));
    }
}
