//! # hybridpdf
//!
//! Hybrid PDF to hierarchical JSON extraction.
//!
//! Each page is classified as native (it has a text layer) or scanned.
//! Native pages go through rule-based extraction of text, tables and images;
//! scanned pages go through OCR. Pages whose extraction comes up short are
//! handed to an LLM, whose output only fills gaps: content found by rule-based
//! extraction or OCR is never overwritten.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hybridpdf::{convert_file, render};
//!
//! fn main() -> hybridpdf::Result<()> {
//!     let doc = convert_file("document.pdf")?;
//!     for page in doc.incomplete_pages() {
//!         eprintln!("page {} incomplete: {:?}", page.page_number, page.issues);
//!     }
//!     println!("{}", render::to_json(&doc, render::JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Per-page strategy**: rule-based for native pages, OCR for scanned pages
//! - **Completeness checks**: empty, blank or table-less pages are flagged and recovered
//! - **LLM fallback**: Ollama or Gemini structure what other backends missed
//! - **Partial results**: a failing backend marks its page incomplete, never the document
//! - **Parallel processing**: pages run on a Rayon pool, output stays in page order

pub mod backend;
pub mod config;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod text;

// Re-export commonly used types
pub use backend::{
    Backends, Fragment, ImageInput, ImageTableBackend, LlmBackend, LlmProvider, LlmSettings,
    LlmStructurer, OcrBackend, PageContent, RuleBackend, Tesseract,
};
pub use config::{LlmMode, PipelineConfig};
pub use detect::{detect_format_from_bytes, detect_format_from_path, PdfFormat};
pub use error::{Error, Result};
pub use model::{
    ChartData, Classification, Content, ConversionStats, DocumentInfo, Element, ElementKind,
    ExtractionResult, HierarchicalDocument, ImageRef, Origin, PageHandle, PageIssue, PageNode,
    Region,
};
pub use parser::LopdfBackend;
pub use pipeline::Pipeline;
pub use render::JsonFormat;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Convert a PDF file with the default configuration.
///
/// OCR uses `tesseract` when it is installed. The LLM fallback is configured
/// from `LLM_PROVIDER` and related environment variables; without them pages
/// that need it are marked incomplete.
///
/// # Example
///
/// ```no_run
/// let doc = hybridpdf::convert_file("scan.pdf").unwrap();
/// println!("{} pages, complete: {}", doc.page_count(), doc.complete);
/// ```
pub fn convert_file<P: AsRef<Path>>(path: P) -> Result<HierarchicalDocument> {
    HybridPdf::from_env()?.convert_file(path)
}

/// Convert a PDF held in memory with the default configuration.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("document.pdf").unwrap();
/// let doc = hybridpdf::convert_bytes(&data).unwrap();
/// ```
pub fn convert_bytes(data: &[u8]) -> Result<HierarchicalDocument> {
    HybridPdf::from_env()?.convert_bytes(data)
}

/// Convert a PDF on a blocking worker of the current Tokio runtime.
#[cfg(feature = "async")]
pub async fn convert_bytes_async(data: Vec<u8>) -> Result<HierarchicalDocument> {
    tokio::task::spawn_blocking(move || convert_bytes(&data))
        .await
        .map_err(|e| Error::Other(format!("conversion task failed: {}", e)))?
}

/// Builder for configuring backends and converting documents.
///
/// # Example
///
/// ```no_run
/// use hybridpdf::{HybridPdf, LlmProvider, LlmSettings, PipelineConfig};
///
/// let config = PipelineConfig::new()
///     .with_ocr_languages(["eng", "deu"])
///     .with_llm_timeout_secs(60);
/// let llm = LlmSettings::new(LlmProvider::Ollama).with_model("llava");
///
/// let doc = HybridPdf::new()
///     .with_config(config)
///     .with_llm_settings(&llm)?
///     .convert_file("document.pdf")?;
/// # Ok::<(), hybridpdf::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct HybridPdf {
    backends: Backends,
    config: PipelineConfig,
    /// Connection settings the LLM is rebuilt from at conversion time
    llm_settings: Option<LlmSettings>,
}

impl HybridPdf {
    /// Rule-based extraction plus Tesseract when installed; no LLM.
    pub fn new() -> Self {
        Self {
            backends: Backends::detect(),
            config: PipelineConfig::default(),
            llm_settings: None,
        }
    }

    /// Like [`HybridPdf::new`], with the LLM taken from the environment.
    ///
    /// An LLM that cannot be set up (e.g. Gemini without an API key) is left
    /// out; pages that need it then report `llm_unavailable`.
    pub fn from_env() -> Result<Self> {
        let builder = Self::new();
        let Some(settings) = LlmSettings::from_env()? else {
            return Ok(builder);
        };
        match builder.clone().with_llm_settings(&settings) {
            Err(Error::LlmUnavailable(reason)) => {
                log::warn!("LLM fallback disabled: {}", reason);
                Ok(builder)
            }
            other => other,
        }
    }

    /// No optional backends: rule-based extraction only.
    pub fn rule_based_only() -> Self {
        Self {
            backends: Backends::none(),
            config: PipelineConfig::default(),
            llm_settings: None,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrBackend>) -> Self {
        self.backends = self.backends.with_ocr(ocr);
        self
    }

    pub fn with_image_tables(mut self, backend: Arc<dyn ImageTableBackend>) -> Self {
        self.backends = self.backends.with_image_tables(backend);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmBackend>) -> Self {
        self.backends = self.backends.with_llm(llm);
        self.llm_settings = None;
        self
    }

    /// Build the LLM backend from connection settings.
    ///
    /// Settings are checked here. The HTTP client is built again for each
    /// conversion with the LLM timeout configured at that point, so this may
    /// be called before or after [`HybridPdf::with_config`].
    pub fn with_llm_settings(self, settings: &LlmSettings) -> Result<Self> {
        let structurer = LlmStructurer::from_settings(&settings.clone().with_timeout(self.config.llm_timeout))?;
        let mut builder = self.with_llm(Arc::new(structurer));
        builder.llm_settings = Some(settings.clone());
        Ok(builder)
    }

    /// Disable OCR, also for scanned pages.
    pub fn without_ocr(mut self) -> Self {
        self.backends = self.backends.without_ocr();
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Convert a PDF file.
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<HierarchicalDocument> {
        self.run(LopdfBackend::load_file(path)?)
    }

    /// Convert a PDF from bytes.
    pub fn convert_bytes(&self, data: &[u8]) -> Result<HierarchicalDocument> {
        self.run(LopdfBackend::load_bytes(data)?)
    }

    /// Convert a PDF from a reader.
    pub fn convert_reader<R: Read>(&self, reader: R) -> Result<HierarchicalDocument> {
        self.run(LopdfBackend::load_reader(reader)?)
    }

    /// LLM settings carrying the currently configured timeout.
    fn effective_llm_settings(&self) -> Option<LlmSettings> {
        self.llm_settings
            .as_ref()
            .map(|s| s.clone().with_timeout(self.config.llm_timeout))
    }

    /// Backends for one conversion.
    fn resolved_backends(&self) -> Result<Backends> {
        match self.effective_llm_settings() {
            Some(settings) => {
                let structurer = LlmStructurer::from_settings(&settings)?;
                Ok(self.backends.clone().with_llm(Arc::new(structurer)))
            }
            None => Ok(self.backends.clone()),
        }
    }

    fn run(&self, source: LopdfBackend) -> Result<HierarchicalDocument> {
        let pipeline = Pipeline::new(self.resolved_backends()?, self.config.clone());
        pipeline.run(Arc::new(source))
    }
}

impl Default for HybridPdf {
    fn default() -> Self {
        Self::new()
    }
}
