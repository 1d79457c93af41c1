//! Source aggregation and rendering.
//!
//! Retrieval results travel through the pipeline as raw citation text (see
//! [`format_citation`]) and are turned into numbered Markdown blocks only
//! when the report is finalized.

use itertools::izip;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{info, warn};

use yanjiu_core::{GeneratedQuery, SourceBundle, SourceRecord};

static SOURCE_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Source\*\*\s*(\d+)").expect("source number regex is valid"));

static UNORDERED_LIST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\s*)([*+-])(\s+)").expect("list regex is valid"));

static ORDERED_LIST_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\s*)(\d+\.)(\s+)").expect("list regex is valid"));

static MARKDOWN_LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("markdown link regex is valid"));

static HTML_LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s+href\s*=\s*["']([^"']*)["']([^>]*)>([^<]*)</a>"#)
        .expect("html link regex is valid")
});

static PLAIN_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:https?|ftp|ftps|file)://[^\s<>"{}|\\^`\[\]]+"#)
        .expect("url regex is valid")
});

static MAILTO_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bmailto:(?://)?[^\s<>"{}|\\^`\[\]]+"#).expect("mailto regex is valid")
});

static WWW_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bwww\.[^\s<>"{}|\\^`\[\]]+"#).expect("www regex is valid"));

const ENTRY_DELIMITER: &str = "---\nQUERY:";
const PART_MARKERS: [&str; 4] = ["QUERY:", "ANSWER:", "CITATION:", "CITATIONS:"];
const REDACTED: &str = "link redacted";
const URL_TRAILING: &[char] = &['.', ',', '!', '?', ';', ':', ')'];

/// The canonical citation text for one retrieval result.
pub fn format_citation(query: &str, answer: &str, citation: &str) -> String {
    format!("\n---\nQUERY: \n{query}\n\nANSWER: \n{answer}\n\nCITATION:\n{citation}\n\n")
}

/// Zip citations, answers and queries into a source bundle in XML form.
///
/// Tuples are taken positionally and the shortest input bounds the output.
/// Nothing is deduplicated: two identical results stay two sources.
pub fn deduplicate_and_format_sources(
    citations: &[String],
    answers: &[String],
    queries: &[GeneratedQuery],
) -> String {
    let bundle: SourceBundle = izip!(queries, citations, answers)
        .map(|(query, citation, answer)| SourceRecord {
            query: query.query().to_string(),
            answer: answer.clone(),
            section: query.report_section().to_string(),
            citation: citation.clone(),
        })
        .collect();
    let xml = bundle.to_xml();
    info!(sources = bundle.len(), "Aggregated retrieval results");
    xml
}

/// Render raw citation text as numbered Markdown source blocks.
///
/// Numbering starts at `source_num_start`, or 1. Entries that do not have
/// the query/answer/citation shape are passed through but still take a
/// number, so labels stay aligned with retrieval rounds.
pub fn format_sources(citation_text: &str, source_num_start: Option<usize>) -> String {
    try_format_sources(citation_text, source_num_start.unwrap_or(1)).unwrap_or_else(|| {
        warn!("Error formatting sources, returning them unchanged");
        citation_text.to_string()
    })
}

fn try_format_sources(citation_text: &str, start: usize) -> Option<String> {
    let mut formatted = Vec::new();
    let mut count = start;

    for entry in split_entries(citation_text) {
        if entry.trim().is_empty() {
            continue;
        }

        let parts = split_parts(entry.trim());
        if parts.len() >= 4 {
            let query = parts.get(1)?.strip_prefix("QUERY:").unwrap_or(parts[1]).trim();
            let answer = parts.get(2)?.strip_prefix("ANSWER:").unwrap_or(parts[2]).trim();
            let citations = parts.get(3..)?.concat();
            formatted.push(format!(
                "\n---\n**Source** {count}\n\n**Query:** {query}\n\n**Answer:**\n{answer}\n\n{citations}\n"
            ));
        } else {
            info!("Failed to clean up {entry} because it failed to parse");
            formatted.push(entry.to_string());
        }
        count = count.checked_add(1)?;
    }

    Some(formatted.join("\n"))
}

/// Split before every entry delimiter, keeping the delimiter with the entry
/// that follows it.
fn split_entries(text: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(ENTRY_DELIMITER) {
        entries.push(&text[start..idx]);
        start = idx;
    }
    entries.push(&text[start..]);
    entries
}

/// Split an entry at each newline that starts a marker line, unless the
/// newline ends a table row (`|`).
fn split_parts(entry: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, _) in entry.match_indices('\n') {
        let follows_marker = PART_MARKERS
            .iter()
            .any(|marker| entry[idx + 1..].starts_with(marker));
        let ends_table_row = entry[..idx].ends_with('|');
        if follows_marker && !ends_table_row {
            parts.push(&entry[start..idx]);
            start = idx + 1;
        }
    }
    parts.push(&entry[start..]);
    parts
}

/// The highest `**Source** N` label in `text`, or 0.
pub fn get_max_source_number(text: &str) -> usize {
    SOURCE_NUMBER_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

/// Escape Markdown list markers, table pipes and newlines so text renders
/// verbatim on one line.
pub fn escape_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = UNORDERED_LIST_REGEX.replace_all(text, r"${1}\${2}${3}");
    let text = ORDERED_LIST_REGEX.replace_all(&text, r"${1}\${2}${3}");
    text.replace('|', "\\|").replace('\n', "\\n")
}

/// Escape HTML metacharacters, quotes included.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace links in Markdown text with "link redacted".
///
/// Markdown links keep their text, HTML anchors keep their attributes and
/// text, and bare URLs (`http`, `https`, `ftp`, `ftps`, `file`, `mailto`,
/// `www.`) are replaced whole. Punctuation trailing a bare URL is kept.
pub fn redact_urls(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = MARKDOWN_LINK_REGEX.replace_all(text, "[${1}](link redacted)");
    let text = HTML_LINK_REGEX.replace_all(&text, r#"<a href="link redacted"${2}>${3}</a>"#);
    let text = PLAIN_URL_REGEX.replace_all(&text, |caps: &Captures<'_>| {
        let m = &caps[0];
        let prefix = m.find("://").map_or(m.len(), |idx| idx + 3);
        redact_bare(m, prefix)
    });
    let text = MAILTO_REGEX.replace_all(&text, |caps: &Captures<'_>| {
        let m = &caps[0];
        let prefix = if m[7..].starts_with("//") { 9 } else { 7 };
        redact_bare(m, prefix)
    });
    let text = WWW_REGEX.replace_all(&text, |caps: &Captures<'_>| redact_bare(&caps[0], 4));
    text.into_owned()
}

fn redact_bare(matched: &str, prefix_len: usize) -> String {
    let trimmed = matched.trim_end_matches(URL_TRAILING);
    if trimmed.len() <= prefix_len {
        return matched.to_string();
    }
    format!("{REDACTED}{}", &matched[trimmed.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn three_citations() -> String {
        [
            format_citation("q1", "a1", "doc1.pdf"),
            format_citation("q2", "a2", "https://two.example"),
            format_citation("q3", "a3", "doc3.pdf"),
        ]
        .join("\n")
    }

    #[test]
    fn test_format_citation() {
        assert_eq!(
            format_citation("gpu", "fast", "a.pdf"),
            "\n---\nQUERY: \ngpu\n\nANSWER: \nfast\n\nCITATION:\na.pdf\n\n"
        );
    }

    #[test]
    fn test_format_sources_block_shape() {
        let out = format_sources(&format_citation("gpu", "fast", "a.pdf"), None);
        assert_eq!(
            out,
            "\n---\n**Source** 1\n\n**Query:** gpu\n\n**Answer:**\nfast\n\nCITATION:\na.pdf\n"
        );
    }

    #[test]
    fn test_format_sources_numbering_offset() {
        let out = format_sources(&three_citations(), Some(5));
        assert!(out.contains("**Source** 5"));
        assert!(out.contains("**Source** 6"));
        assert!(out.contains("**Source** 7"));
        assert!(!out.contains("**Source** 8"));
        assert_eq!(get_max_source_number(&out), 7);
    }

    #[test]
    fn test_format_sources_keeps_table_rows_together() {
        let citation = format_citation("q", "| a |\nANSWER: inside table |", "c");
        let out = format_sources(&citation, None);
        assert!(out.contains("**Source** 1"));
        assert!(out.contains("| a |\nANSWER: inside table |"));
    }

    #[test]
    fn test_format_sources_passes_through_malformed_entries() {
        let text = format!("---\nQUERY: orphan{}", format_citation("q", "a", "c"));
        let out = format_sources(&text, None);
        assert!(out.starts_with("---\nQUERY: orphan"));
        assert!(out.contains("**Source** 2"));
    }

    #[test]
    fn test_format_sources_empty() {
        assert_eq!(format_sources("", None), "");
        assert_eq!(format_sources("  \n ", Some(3)), "");
    }

    #[test]
    fn test_get_max_source_number() {
        assert_eq!(get_max_source_number("no sources"), 0);
        assert_eq!(
            get_max_source_number("**Source** 2 ... **Source**12 ... **Source** 4"),
            12
        );
    }

    #[test]
    fn test_aggregation_cardinality_and_order() {
        let queries: Vec<GeneratedQuery> = ["alpha", "beta", "gamma"]
            .iter()
            .map(|q| GeneratedQuery::new(q, format!("sec-{q}"), "r").unwrap())
            .collect();
        let answers: Vec<String> = vec!["A".into(), "A".into(), "C".into()];
        let citations: Vec<String> = vec!["c1".into(), "c2".into(), "c3".into()];

        let xml = deduplicate_and_format_sources(&citations, &answers, &queries);
        assert_eq!(xml.matches("<source>").count(), 3);
        let alpha = xml.find("alpha").unwrap();
        let beta = xml.find("beta").unwrap();
        let gamma = xml.find("gamma").unwrap();
        assert!(alpha < beta && beta < gamma);

        let short = deduplicate_and_format_sources(&citations[..2], &answers, &queries);
        assert_eq!(short.matches("<source>").count(), 2);
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("- item\n1. first | x"), r"\- item\n\1. first \| x");
        assert_eq!(escape_markdown(""), "");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test_case("Check out [this link](https://example.com) for more info", "Check out [this link](link redacted) for more info" ; "markdown link")]
    #[test_case("Here's a [reference](http://test.org/path?param=value)", "Here's a [reference](link redacted)" ; "markdown link with query")]
    #[test_case(r#"Visit <a href="https://example.com">our website</a> for details"#, r#"Visit <a href="link redacted">our website</a> for details"# ; "html link")]
    #[test_case(r#"Click <a href="http://test.org" target="_blank">here</a>"#, r#"Click <a href="link redacted" target="_blank">here</a>"# ; "html link with attributes")]
    #[test_case("Visit https://example.com for more information", "Visit link redacted for more information" ; "plain url")]
    #[test_case("The API is at http://api.test.org/v1/endpoint", "The API is at link redacted" ; "plain url with path")]
    #[test_case("Check www.example.com for updates", "Check link redacted for updates" ; "www url")]
    #[test_case("Here's a [link](https://example.com) and also visit http://test.org or www.demo.com", "Here's a [link](link redacted) and also visit link redacted or link redacted" ; "mixed")]
    #[test_case("FTP: ftp://files.example.com, Mailto: mailto:user@example.com", "FTP: link redacted, Mailto: link redacted" ; "other protocols")]
    #[test_case("Visit https://example.com. Then go to http://test.org!", "Visit link redacted. Then go to link redacted!" ; "trailing punctuation")]
    #[test_case("See (https://example.com) for details", "See (link redacted) for details" ; "parenthesized")]
    #[test_case("No URLs here", "No URLs here" ; "no urls")]
    #[test_case("", "" ; "empty")]
    fn test_redact_urls(input: &str, expected: &str) {
        assert_eq!(redact_urls(input), expected);
    }

    #[test]
    fn test_redact_urls_complex_markdown() {
        let input = "# Title\n\nThis is a [link](https://example.com) and another [one](http://test.org).\n\nVisit <a href='https://demo.com'>demo</a>.";
        let result = redact_urls(input);
        assert!(result.contains("[link](link redacted)"));
        assert!(result.contains("[one](link redacted)"));
        assert!(result.starts_with("# Title"));
        assert!(result.ends_with(r#"<a href="link redacted">demo</a>."#));
    }
}
