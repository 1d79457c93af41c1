//! Retrieval results and their XML bundle form.

use serde::{Deserialize, Serialize};

/// One retrieval result: the query, the answer, the report section it feeds
/// and the raw citation text.
///
/// The citation keeps the `QUERY:` / `ANSWER:` / `CITATION:` markers intact
/// so it can be re-parsed when the Sources section is rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SourceRecord {
    /// Query that produced the answer.
    pub query: String,
    /// Answer text returned by the backend.
    pub answer: String,
    /// Report section the query belongs to.
    pub section: String,
    /// Raw citation text.
    pub citation: String,
}

/// An ordered collection of [`SourceRecord`]s from one retrieval round.
///
/// Records are kept in insertion order and never deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SourceBundle {
    records: Vec<SourceRecord>,
}

impl SourceBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: SourceRecord) {
        self.records.push(record);
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the bundle has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize as `<sources><source>...</source></sources>`.
    ///
    /// All text content is escaped so answers and citations containing
    /// markup cannot break the structure.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<sources>");
        for record in &self.records {
            xml.push_str("<source>");
            push_element(&mut xml, "query", &record.query);
            push_element(&mut xml, "answer", &record.answer);
            push_element(&mut xml, "section", &record.section);
            push_element(&mut xml, "citation", &record.citation);
            xml.push_str("</source>");
        }
        xml.push_str("</sources>");
        xml
    }
}

impl FromIterator<SourceRecord> for SourceBundle {
    fn from_iter<I: IntoIterator<Item = SourceRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

fn push_element(xml: &mut String, tag: &str, text: &str) {
    if text.is_empty() {
        xml.push('<');
        xml.push_str(tag);
        xml.push_str(" />");
        return;
    }
    xml.push('<');
    xml.push_str(tag);
    xml.push('>');
    xml.push_str(&escape_xml(text));
    xml.push_str("</");
    xml.push_str(tag);
    xml.push('>');
}

/// Escape XML metacharacters in text content.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
