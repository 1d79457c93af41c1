//! Prompt templates used by the pipeline stages.
//!
//! Templates use `{name}` placeholders. Rendering is a single pass, so a
//! substituted value that itself contains `{name}` is left alone, and braces
//! that do not name a known variable (for example JSON examples inside a
//! prompt) are copied through untouched.

use serde::{Deserialize, Serialize};

const QUERY_WRITER: &str = r#"Your goal is to generate targeted web search queries that will gather information for a report on the topic below.

The report will follow this organization:
{report_organization}

Topic:
{topic}

Generate {number_of_queries} queries. Each query should cover a different aspect of the topic and name the report section it supports.

Return a JSON list of objects with exactly these keys:
[
  {"query": "search text", "report_section": "section the query informs", "rationale": "why this query helps"}
]"#;

const RELEVANCY_CHECKER: &str = r#"You are a grader assessing whether a retrieved answer is relevant to a user query.

Answer:
{document}

Query:
{query}

If the answer contains information that addresses the query, grade it as relevant. Give a binary score "yes" or "no".
Respond with JSON only, in the form {"score": "yes"} or {"score": "no"}."#;

const SUMMARIZER: &str = r#"Write a report that follows the organization below, using only the provided sources.

Report organization:
{report_organization}

Sources:
{source}

Use markdown headings for each section. Do not include a list of sources; they are added separately."#;

const REPORT_EXTENDER: &str = r#"Extend the existing report with the new sources. Keep the existing structure, integrate new facts into the relevant sections, and do not drop existing content.

Existing report:
{report}

New sources:
{source}

Return the complete updated report."#;

const REFLECTION: &str = r#"You are reviewing a draft report on the topic below.

Topic:
{topic}

Report organization:
{report_organization}

Current report:
{report}

Identify the most important knowledge gap and propose a single follow-up search query to fill it.
Respond with JSON in the form {"query": "follow-up search query"}."#;

const FINALIZE: &str = r#"Polish the draft report below into a final version that follows the report organization.

Report organization:
{report_organization}

Draft report:
{report}

Fix formatting, remove repetition, and keep every fact. Do not add a sources section."#;

const ARTIFACT_GUARDRAIL: &str = r#"Decide whether the user prompt is related to the artifact.

Artifact:
{artifact}

User prompt:
{prompt}

Respond with JSON only, in the form {"relevant": "yes"} or {"relevant": "no"}."#;

const ARTIFACT_REWRITE: &str = r#"You are rewriting an artifact at the user's request.

Current artifact:
<artifact>
{artifact}
</artifact>

Rewrite the entire artifact to satisfy the request. Return only the new artifact, without commentary."#;

const ARTIFACT_CHAT_SYSTEM: &str =
    "You are a helpful assistant answering questions about a research report. Ground answers in the report and any supplied context.";

/// The full set of prompts.
///
/// Every field can be replaced, for example to tune prompts for a specific
/// model, as long as it keeps the placeholders the stage renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PromptTemplates {
    /// `{topic}`, `{report_organization}`, `{number_of_queries}`
    pub query_writer: String,
    /// `{document}`, `{query}`
    pub relevancy_checker: String,
    /// `{report_organization}`, `{source}`
    pub summarizer: String,
    /// `{report}`, `{source}`
    pub report_extender: String,
    /// `{report_organization}`, `{topic}`, `{report}`
    pub reflection: String,
    /// `{report}`, `{report_organization}`
    pub finalize: String,
    /// `{artifact}`, `{prompt}`
    pub artifact_guardrail: String,
    /// `{artifact}`
    pub artifact_rewrite: String,
    /// System prompt for artifact Q&A.
    pub artifact_chat_system: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            query_writer: QUERY_WRITER.to_string(),
            relevancy_checker: RELEVANCY_CHECKER.to_string(),
            summarizer: SUMMARIZER.to_string(),
            report_extender: REPORT_EXTENDER.to_string(),
            reflection: REFLECTION.to_string(),
            finalize: FINALIZE.to_string(),
            artifact_guardrail: ARTIFACT_GUARDRAIL.to_string(),
            artifact_rewrite: ARTIFACT_REWRITE.to_string(),
            artifact_chat_system: ARTIFACT_CHAT_SYSTEM.to_string(),
        }
    }
}

/// Substitute `{name}` placeholders in `template`.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match value {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
