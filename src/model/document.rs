//! Document-level types.

use super::{Classification, ConversionStats, Element, ElementKind, PageIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The hierarchical JSON document produced by a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalDocument {
    /// Source and metadata
    pub info: DocumentInfo,

    /// True when every page is complete
    pub complete: bool,

    /// Pages in document order
    pub pages: Vec<PageNode>,

    /// Counts over the whole document
    pub stats: ConversionStats,
}

impl HierarchicalDocument {
    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn page(&self, number: u32) -> Option<&PageNode> {
        self.pages.iter().find(|p| p.page_number == number)
    }

    /// Pages flagged incomplete.
    pub fn incomplete_pages(&self) -> impl Iterator<Item = &PageNode> {
        self.pages.iter().filter(|p| !p.complete)
    }

    /// Every element of a given kind, in document order.
    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.pages
            .iter()
            .flat_map(|p| p.elements.iter())
            .filter(move |e| e.kind == kind)
    }

    /// Plain text of the whole document.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(PageNode::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// One page of the output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNode {
    /// Page number (1-indexed)
    pub page_number: u32,

    pub width: f32,
    pub height: f32,
    pub classification: Classification,
    pub complete: bool,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub issues: Vec<PageIssue>,

    #[serde(default)]
    pub llm_invoked: bool,

    /// Elements in reading order
    pub elements: Vec<Element>,
}

impl PageNode {
    /// Plain text of the page, elements separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .filter(|e| e.kind != ElementKind::Image)
            .map(Element::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Document source and metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// File name or caller-supplied label
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages
    pub page_count: u32,

    /// Whether the document is encrypted
    pub encrypted: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subject: Option<String>,

    /// Creator application
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub creator: Option<String>,

    /// PDF producer
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub producer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub modified: Option<DateTime<Utc>>,
}

impl DocumentInfo {
    /// Create info with a PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }

    /// Set the source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`).
///
/// Missing components default to the start of their range; the timezone
/// suffix is ignored and the result is taken as UTC.
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 {
        return None;
    }

    let field = |range: std::ops::Range<usize>, default: u32| -> Option<u32> {
        match s.get(range) {
            Some(part) if part.chars().all(|c| c.is_ascii_digit()) => part.parse().ok(),
            Some(_) => None,
            None => Some(default),
        }
    };

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month = field(4..6, 1)?;
    let day = field(6..8, 1)?;
    let hour = field(8..10, 0)?;
    let minute = field(10..12, 0)?;
    let second = field(12..14, 0)?;

    let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    let datetime = date.and_hms_opt(hour, minute, second)?;
    Some(DateTime::from_naive_utc_and_offset(datetime, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Origin;
    use chrono::{Datelike, Timelike};

    fn page(number: u32, complete: bool, elements: Vec<Element>) -> PageNode {
        PageNode {
            page_number: number,
            width: 612.0,
            height: 792.0,
            classification: Classification::Native,
            complete,
            issues: if complete {
                vec![]
            } else {
                vec![PageIssue::NoContent]
            },
            llm_invoked: false,
            elements,
        }
    }

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240315103045+09'00'").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 3);
        assert_eq!(date.day(), 15);
        assert_eq!(date.hour(), 10);
        assert_eq!(date.second(), 45);

        let date = parse_pdf_date("D:2021").unwrap();
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 1);

        assert!(parse_pdf_date("D:20").is_none());
        assert!(parse_pdf_date("D:20241399").is_none());
    }

    #[test]
    fn test_document_accessors() {
        let pages = vec![
            page(1, true, vec![Element::text(Origin::Rule, "lopdf", "Intro")]),
            page(
                2,
                false,
                vec![Element::table(
                    Origin::Rule,
                    "lopdf",
                    vec![vec!["a".into(), "b".into()]],
                )],
            ),
        ];
        let doc = HierarchicalDocument {
            info: DocumentInfo::with_version("1.7").with_source("report.pdf"),
            complete: false,
            stats: ConversionStats::from_pages(&pages),
            pages,
        };

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page(2).map(|p| p.page_number), Some(2));
        assert!(doc.page(3).is_none());
        assert_eq!(doc.incomplete_pages().count(), 1);
        assert_eq!(doc.elements_of(ElementKind::Table).count(), 1);
        assert_eq!(doc.plain_text(), "Intro\n\na | b");
        assert_eq!(doc.stats.incomplete_pages, 1);
        assert_eq!(doc.stats.rule_elements, 2);
        assert_eq!(doc.stats.word_count, 1);
    }

    #[test]
    fn test_issues_omitted_when_empty() {
        let json = serde_json::to_value(page(1, true, vec![])).unwrap();
        assert!(json.get("issues").is_none());
        assert_eq!(json["page_number"], 1);
        assert_eq!(json["classification"], "native");
    }
}
