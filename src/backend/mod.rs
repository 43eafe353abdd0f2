//! Extraction backends.
//!
//! Each capability is a trait so the pipeline can run against any mix of
//! implementations: [`RuleBackend`] reads the PDF itself, [`OcrBackend`] and
//! [`ImageTableBackend`] work on page rasters or embedded images, and
//! [`LlmBackend`] structures whatever the others left incomplete.

pub mod llm;
mod native;
mod tesseract;

use std::sync::Arc;

use crate::error::Result;
use crate::model::{DocumentInfo, Element, ImageRef, PageHandle, Region};

pub use llm::{GeminiClient, LlmClient, LlmProvider, LlmSettings, LlmStructurer, OllamaClient};
pub use tesseract::{parse_tsv, Tesseract, TsvWord};

/// An image together with the page region it covers.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub image: ImageRef,
    pub region: Region,
}

impl ImageInput {
    pub fn new(image: ImageRef, region: Region) -> Self {
        Self { image, region }
    }
}

/// Everything the LLM gets to see about one page.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
    /// Raw text known for the page (native or OCR)
    pub text: String,
    /// Elements already extracted by other backends
    pub elements: Vec<Element>,
    /// Page raster, when one could be produced
    pub image: Option<ImageRef>,
}

/// Elements returned by an LLM call.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub elements: Vec<Element>,
}

impl Fragment {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(Element::is_empty)
    }
}

/// Rule-based access to a parsed document.
pub trait RuleBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Page handles in document order.
    fn pages(&self) -> Vec<PageHandle>;

    fn info(&self) -> DocumentInfo;

    /// Raw text of a page, used for native/scanned classification.
    fn probe_text(&self, page: &PageHandle) -> Result<String>;

    fn extract_native_text(&self, page: &PageHandle) -> Result<Vec<Element>>;

    fn extract_native_tables(&self, page: &PageHandle) -> Result<Vec<Element>>;

    fn extract_images(&self, page: &PageHandle) -> Result<Vec<Element>>;

    /// A raster of the page suitable for OCR.
    fn render_page(&self, page: &PageHandle) -> Result<ImageInput>;
}

/// Optical character recognition on an image.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Recognize text; returned elements carry origin `ocr`.
    fn run_ocr(&self, image: &ImageInput, languages: &[String]) -> Result<Vec<Element>>;
}

/// Table and chart recovery from an image.
pub trait ImageTableBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Returns table or chart elements found in the image.
    fn extract_tables_from_image(&self, image: &ImageInput) -> Result<Vec<Element>>;
}

/// LLM-based structuring of a page.
pub trait LlmBackend: Send + Sync {
    fn name(&self) -> &str;

    fn structure_with_llm(&self, page: &PageContent, prompt: &str) -> Result<Fragment>;
}

/// Optional backends available to the orchestrator.
#[derive(Clone, Default)]
pub struct Backends {
    pub ocr: Option<Arc<dyn OcrBackend>>,
    pub image_tables: Option<Arc<dyn ImageTableBackend>>,
    pub llm: Option<Arc<dyn LlmBackend>>,
}

impl Backends {
    /// No optional backends: rule-based extraction only.
    pub fn none() -> Self {
        Self::default()
    }

    /// Tesseract for OCR and image tables, when the binary is installed.
    pub fn detect() -> Self {
        let tesseract = Tesseract::new();
        if tesseract.is_available() {
            let tesseract = Arc::new(tesseract);
            Self {
                ocr: Some(tesseract.clone()),
                image_tables: Some(tesseract),
                llm: None,
            }
        } else {
            log::warn!("tesseract not found; scanned pages will be incomplete");
            Self::none()
        }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrBackend>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_image_tables(mut self, backend: Arc<dyn ImageTableBackend>) -> Self {
        self.image_tables = Some(backend);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmBackend>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn without_ocr(mut self) -> Self {
        self.ocr = None;
        self
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("ocr", &self.ocr.as_ref().map(|b| b.name().to_string()))
            .field("image_tables", &self.image_tables.as_ref().map(|b| b.name().to_string()))
            .field("llm", &self.llm.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}
