//! Lenient JSON extraction from model output.
//!
//! Models often wrap JSON in markdown fences or surround it with prose.
//! [`parse_json_markdown`] digs the payload out; [`Parsed`] records whether
//! a value came from the model or from a fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use yanjiu_core::{Result, YanjiuError};

static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?(.*?)(?:```|$)").expect("fence regex is valid"));

/// Parse a JSON value out of free-form model text.
///
/// A fenced block (```` ```json ... ``` ````) wins if present. Otherwise the
/// whole text is tried, then the widest `{...}` or `[...]` span inside it.
pub fn parse_json_markdown(text: &str) -> Result<serde_json::Value> {
    let candidate = FENCE_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str());
    let candidate = candidate.trim().trim_matches('`').trim();

    if let Ok(value) = serde_json::from_str(candidate) {
        return Ok(value);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (candidate.find(open), candidate.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&candidate[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(YanjiuError::validation(
        "Model output does not contain valid JSON",
    ))
}

/// A value parsed from model output, or the marker that parsing failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    /// The model produced a well-formed value.
    Parsed(T),
    /// The output could not be parsed; callers substitute their fallback.
    Default,
}

impl<T: DeserializeOwned> Parsed<T> {
    /// Parse `text` into `T`, recording failure instead of returning it.
    pub fn from_llm_output(text: &str) -> Self {
        match parse_json_markdown(text).and_then(|value| Ok(serde_json::from_value(value)?)) {
            Ok(value) => Self::Parsed(value),
            Err(e) => {
                debug!("Falling back to default for unparseable model output: {e}");
                Self::Default
            }
        }
    }
}

impl<T> Parsed<T> {
    /// Whether parsing failed.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// The parsed value, or `fallback` when parsing failed.
    pub fn into_value(self, fallback: T) -> T {
        match self {
            Self::Parsed(value) => value,
            Self::Default => fallback,
        }
    }
}

impl<T: Default> Parsed<T> {
    /// The parsed value, or `T::default()` when parsing failed.
    pub fn unwrap_or_default(self) -> T {
        self.into_value(T::default())
    }
}
