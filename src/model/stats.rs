//! Conversion statistics.

use super::{Classification, Element, ElementKind, Origin, PageNode};
use serde::{Deserialize, Serialize};

/// Statistics collected over a converted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Total number of pages
    pub page_count: u32,

    /// Pages classified as native
    pub native_pages: u32,

    /// Pages classified as scanned
    pub scanned_pages: u32,

    /// Pages flagged incomplete
    pub incomplete_pages: u32,

    /// Pages the LLM was invoked for
    pub llm_pages: u32,

    /// Backend failures and timeouts across all pages
    pub backend_failures: u32,

    pub text_count: u32,
    pub table_count: u32,
    pub image_count: u32,
    pub chart_count: u32,

    /// Elements produced by rule-based extraction
    pub rule_elements: u32,

    /// Elements produced by OCR or image analysis
    pub ocr_elements: u32,

    /// Elements produced by the LLM
    pub llm_elements: u32,

    /// Approximate word count over text elements
    pub word_count: u32,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect statistics from assembled pages.
    pub fn from_pages(pages: &[PageNode]) -> Self {
        let mut stats = Self::new();
        for page in pages {
            stats.add_page(page);
        }
        stats
    }

    fn add_page(&mut self, page: &PageNode) {
        self.page_count += 1;
        match page.classification {
            Classification::Native => self.native_pages += 1,
            Classification::Scanned => self.scanned_pages += 1,
        }
        if !page.complete {
            self.incomplete_pages += 1;
        }
        if page.llm_invoked {
            self.llm_pages += 1;
        }
        self.backend_failures += page.issues.iter().filter(|i| i.is_failure()).count() as u32;
        for element in &page.elements {
            self.add_element(element);
        }
    }

    fn add_element(&mut self, element: &Element) {
        match element.kind {
            ElementKind::Text => {
                self.text_count += 1;
                if let Some(text) = element.as_text() {
                    self.word_count += text.split_whitespace().count() as u32;
                }
            }
            ElementKind::Table => self.table_count += 1,
            ElementKind::Image => self.image_count += 1,
            ElementKind::Chart => self.chart_count += 1,
        }
        match element.origin {
            Origin::Rule => self.rule_elements += 1,
            Origin::Ocr => self.ocr_elements += 1,
            Origin::Llm => self.llm_elements += 1,
        }
    }

    /// Total number of elements.
    pub fn element_count(&self) -> u32 {
        self.text_count + self.table_count + self.image_count + self.chart_count
    }
}
