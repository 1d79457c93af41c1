//! Handling of `<think>` reasoning blocks in model output.

/// Opening reasoning tag.
pub const THINK_OPEN: &str = "<think>";

/// Closing reasoning tag.
pub const THINK_CLOSE: &str = "</think>";

/// Result of removing reasoning from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stripped {
    /// Visible text with reasoning removed.
    Clean(String),
    /// Reasoning was opened but never closed by a model that must close it.
    Incomplete,
}

/// Remove `<think>...</think>` blocks from `text`.
///
/// Every complete block is removed. Anything before a dangling `</think>` is
/// reasoning whose opening tag was lost and is dropped as well. A dangling
/// `<think>` makes the response [`Stripped::Incomplete`] when
/// `requires_close` is set; otherwise only the tag itself is removed.
pub fn strip_reasoning(text: &str, requires_close: bool) -> Stripped {
    let mut out = text.to_string();

    loop {
        match (out.find(THINK_OPEN), out.find(THINK_CLOSE)) {
            (Some(open), Some(close)) if open < close => {
                out.replace_range(open..close + THINK_CLOSE.len(), "");
            }
            (_, Some(close)) => {
                out.replace_range(..close + THINK_CLOSE.len(), "");
            }
            _ => break,
        }
    }

    if out.contains(THINK_OPEN) {
        if requires_close {
            return Stripped::Incomplete;
        }
        out = out.replace(THINK_OPEN, "");
    }

    Stripped::Clean(out)
}

/// The answer part of a response that may start with reasoning.
///
/// Returns the trimmed text after the last `</think>`. Without the marker,
/// a model that must close its reasoning produced no answer and `None` is
/// returned; other models' output is used whole.
pub fn extract_payload(text: &str, requires_close: bool) -> Option<&str> {
    match text.rfind(THINK_CLOSE) {
        Some(idx) => Some(text[idx + THINK_CLOSE.len()..].trim()),
        None if requires_close => None,
        None => Some(text.trim()),
    }
}

/// System prompt to send to `model_name`.
///
/// Nemotron models only reason when asked to with "detailed thinking on".
pub fn system_prompt_for(model_name: &str, default: &str) -> String {
    if model_name.to_lowercase().contains("nemotron") {
        "detailed thinking on".to_string()
    } else {
        default.to_string()
    }
}
