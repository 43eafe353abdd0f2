//! Per-page types.

use super::{Element, ElementKind, Origin};
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Letter size, used when a page carries no usable MediaBox.
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Identifies one page of the document held by a rule backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageHandle {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,
}

impl PageHandle {
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
        }
    }

    /// Full-page region in page coordinates.
    pub fn bounds(&self) -> super::Region {
        super::Region::new(0.0, 0.0, self.width, self.height)
    }
}

/// Whether a page has a digital text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Native,
    Scanned,
}

/// Why a page is incomplete, or what went wrong while extracting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageIssue {
    /// The native-text probe failed; the page was treated as scanned
    ClassificationProbe { message: String },
    BackendUnavailable { backend: String, message: String },
    BackendFailure { backend: String, message: String },
    BackendTimeout { backend: String, millis: u64 },
    LlmUnavailable { message: String },
    LlmTimeout { millis: u64 },
    /// Extraction produced nothing usable
    NoContent,
    /// Only whitespace text came back
    BlankText,
    /// Image analysis found tables that no extraction filled
    MissingTables { expected: usize },
}

impl PageIssue {
    /// Record a backend error as a page issue.
    pub fn from_error(backend: &str, err: &Error) -> Self {
        match err {
            Error::BackendUnavailable { backend, reason } => PageIssue::BackendUnavailable {
                backend: backend.clone(),
                message: reason.clone(),
            },
            Error::BackendFailure { backend, message } => PageIssue::BackendFailure {
                backend: backend.clone(),
                message: message.clone(),
            },
            Error::BackendTimeout { backend, elapsed } => PageIssue::BackendTimeout {
                backend: backend.clone(),
                millis: elapsed.as_millis() as u64,
            },
            Error::LlmUnavailable(message) => PageIssue::LlmUnavailable {
                message: message.clone(),
            },
            Error::LlmTimeout(elapsed) => PageIssue::LlmTimeout {
                millis: elapsed.as_millis() as u64,
            },
            Error::ClassificationProbe(message) => PageIssue::ClassificationProbe {
                message: message.clone(),
            },
            other => PageIssue::BackendFailure {
                backend: backend.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// True for issues raised by a backend error rather than by the content check.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            PageIssue::ClassificationProbe { .. }
                | PageIssue::NoContent
                | PageIssue::BlankText
                | PageIssue::MissingTables { .. }
        )
    }
}

/// Outcome of extracting one page.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub page: PageHandle,
    pub classification: Classification,
    pub elements: Vec<Element>,
    pub complete: bool,
    pub issues: Vec<PageIssue>,
    pub llm_invoked: bool,
}

impl ExtractionResult {
    /// Elements of a given kind.
    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.kind == kind)
    }

    /// Elements produced by a given technique.
    pub fn elements_from(&self, origin: Origin) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.origin == origin)
    }

    pub fn has_failures(&self) -> bool {
        self.issues.iter().any(PageIssue::is_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_issue_from_error() {
        let issue = PageIssue::from_error(
            "tesseract",
            &Error::BackendTimeout {
                backend: "tesseract".into(),
                elapsed: Duration::from_millis(1500),
            },
        );
        assert_eq!(
            issue,
            PageIssue::BackendTimeout {
                backend: "tesseract".into(),
                millis: 1500
            }
        );

        let issue = PageIssue::from_error("lopdf", &Error::PdfParse("bad xref".into()));
        assert!(matches!(issue, PageIssue::BackendFailure { ref backend, .. } if backend == "lopdf"));
    }

    #[test]
    fn test_failure_split() {
        assert!(PageIssue::LlmTimeout { millis: 10 }.is_failure());
        assert!(!PageIssue::NoContent.is_failure());
        assert!(!PageIssue::ClassificationProbe {
            message: "x".into()
        }
        .is_failure());
    }

    #[test]
    fn test_issue_serialization() {
        let json = serde_json::to_value(PageIssue::MissingTables { expected: 2 }).unwrap();
        assert_eq!(json["kind"], "missing_tables");
        assert_eq!(json["expected"], 2);

        let json = serde_json::to_value(PageIssue::NoContent).unwrap();
        assert_eq!(json["kind"], "no_content");
    }
}
