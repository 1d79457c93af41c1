//! Prompt sanitization for user-supplied text.
//!
//! Every piece of free text that ends up inside an LLM prompt (topics, report
//! organizations, generated queries, artifact questions) goes through
//! [`sanitize_prompt`] first.

use once_cell::sync::Lazy;
use regex::RegexSet;

use crate::{Result, YanjiuError};

/// Maximum length of a single search query.
pub const MAX_QUERY_LENGTH: usize = 2000;

/// Maximum length of a research topic.
pub const MAX_TOPIC_LENGTH: usize = 1000;

/// Maximum length of a report organization or additional context block.
pub const MAX_ORGANIZATION_LENGTH: usize = 5000;

static BLOCKED_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)ignore\s+(?:all\s+)?previous\s+instructions",
        r"(?i)you\s+are\s+now",
        r"(?i)system\s*:",
        r"(?i)<\s*system\s*>",
        r"(?i)\[system\]",
        r"(?i)reveal\s+(?:the\s+)?(?:api|secret|password|key)",
        r"(?i)execute\s+(?:system\s+)?commands?",
        r"(?i)run\s+(?:system\s+)?commands?",
        r"(?i)delete\s+(?:all\s+)?(?:files?|data|collections?)",
        r"(?i)drop\s+table",
        r"(?i)union\s+select",
        r"(?is)<script\b.*?</script>",
        r"(?i)javascript:",
        r"(?i)eval\s*\(",
        r"(?i)exec\s*\(",
    ])
    .expect("blocked prompt patterns are valid regexes")
});

/// Sanitize a user prompt before it is embedded into an LLM prompt.
///
/// Rejects text longer than `max_length` characters or matching a known
/// prompt-injection pattern. Accepted text has section separators removed,
/// system markers neutralized, and surrounding whitespace trimmed.
///
/// # Errors
///
/// Returns [`YanjiuError::Validation`] when the text is too long or contains
/// a blocked pattern.
pub fn sanitize_prompt(prompt: &str, max_length: usize) -> Result<String> {
    if prompt.is_empty() {
        return Ok(String::new());
    }

    let length = prompt.chars().count();
    if length > max_length {
        return Err(YanjiuError::validation(format!(
            "Prompt too long: {length} chars (max: {max_length})"
        )));
    }

    if BLOCKED_PATTERNS.is_match(prompt) {
        return Err(YanjiuError::validation(
            "Prompt contains potentially harmful content",
        ));
    }

    let cleaned = prompt
        .replace("---", "")
        .replace("[SYSTEM]", "[USER_TEXT]")
        .replace("</query>", "&lt;/query&gt;")
        .replace("<system>", "&lt;system&gt;");

    Ok(cleaned.trim().to_string())
}
