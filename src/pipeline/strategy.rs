//! Backend selection as explicit branching over a strategy value.

use crate::config::LlmMode;
use crate::model::Classification;

/// One unit of extraction work on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Text blocks from the content stream
    NativeText,
    /// Tables from text positions
    NativeTables,
    /// Embedded image XObjects
    Images,
    /// Image-table/chart extraction on each extracted image
    EmbeddedImageTables,
    /// OCR on the page raster
    PageOcr,
    /// Image-table/chart extraction on the page raster
    PageImageTables,
    /// The page raster itself as an image element
    PageSnapshot,
}

/// Extraction plan for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    RuleBased,
    Ocr,
}

impl Strategy {
    pub fn for_classification(classification: Classification) -> Self {
        match classification {
            Classification::Native => Strategy::RuleBased,
            Classification::Scanned => Strategy::Ocr,
        }
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Strategy::RuleBased => &[
                Step::NativeText,
                Step::NativeTables,
                Step::Images,
                Step::EmbeddedImageTables,
            ],
            Strategy::Ocr => &[Step::PageOcr, Step::PageImageTables, Step::PageSnapshot],
        }
    }
}

/// Whether the LLM should run on a page.
pub fn llm_decision(mode: LlmMode, complete: bool) -> bool {
    match mode {
        LlmMode::Disabled => false,
        LlmMode::Fallback => !complete,
        LlmMode::Always => true,
    }
}
