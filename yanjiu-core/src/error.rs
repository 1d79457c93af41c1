//! Error types for the Yanjiu research pipeline.
//!
//! Most failures inside a research run are recovered locally and turned into
//! a degraded stage result. The variants here cover what is left: setup and
//! configuration problems, rejected input, and errors surfaced by the
//! collaborator implementations (LLM clients, search backends).

use thiserror::Error;

/// Core error type for Yanjiu.
#[derive(Error, Debug)]
pub enum YanjiuError {
    /// I/O related errors (file reading, network operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// LLM invocation or streaming errors
    #[error("LLM error: {message}")]
    Llm {
        /// Detailed error message
        message: String,
    },

    /// Errors raised by a retrieval backend (RAG, web search, enterprise search)
    #[error("Retrieval error from {backend}: {message}")]
    Retrieval {
        /// Name of the failing backend
        backend: String,
        /// Detailed error message
        message: String,
    },

    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Detailed error message
        message: String,
    },

    /// Input validation errors
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
    },

    /// Operation timeout errors
    #[error("Timeout: {operation}")]
    Timeout {
        /// Name of the operation that timed out
        operation: String,
    },

    /// Internal invariant violations
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },

    /// Generic errors from external dependencies
    #[error("External error: {source}")]
    External {
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

impl YanjiuError {
    /// Create a new LLM error with a message.
    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    /// Create a new retrieval error for a backend.
    pub fn retrieval<B: Into<String>, S: Into<String>>(backend: B, message: S) -> Self {
        Self::Retrieval {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error with a message.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new validation error with a message.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new timeout error with an operation name.
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a new internal error with a message.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new external error from any error that implements `Into<anyhow::Error>`.
    pub fn external<E: Into<anyhow::Error>>(error: E) -> Self {
        Self::External {
            source: error.into(),
        }
    }
}

impl From<anyhow::Error> for YanjiuError {
    fn from(error: anyhow::Error) -> Self {
        Self::External { source: error }
    }
}

/// Result type alias used throughout Yanjiu.
pub type Result<T> = std::result::Result<T, YanjiuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = YanjiuError::retrieval("tavily", "HTTP 502");
        assert!(matches!(err, YanjiuError::Retrieval { .. }));
        assert_eq!(err.to_string(), "Retrieval error from tavily: HTTP 502");
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: YanjiuError = anyhow::anyhow!("socket closed").into();
        assert!(matches!(err, YanjiuError::External { .. }));
        assert_eq!(err.to_string(), "External error: socket closed");
    }
}
