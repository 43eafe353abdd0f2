//! The hybrid extraction pipeline.
//!
//! Each page is classified, extracted with the matching strategy, checked for
//! completeness and, when needed, handed to OCR and the LLM. Pages are
//! independent and may be processed in parallel; assembly restores page order.

pub mod assembler;
pub mod classifier;
pub mod completeness;
pub mod merge;
pub mod orchestrator;
pub mod strategy;
pub mod timeout;

use std::sync::Arc;

use rayon::prelude::*;

use crate::backend::{Backends, RuleBackend};
use crate::config::{LlmMode, PipelineConfig};
use crate::error::{Error, Result};
use crate::model::{ExtractionResult, HierarchicalDocument};

pub use assembler::{assemble, reading_order};
pub use classifier::classify;
pub use completeness::{assess, Assessment, Signals};
pub use merge::{merge, MergeStats};
pub use orchestrator::Orchestrator;
pub use strategy::{llm_decision, Step, Strategy};

/// Converts a document with a fixed set of backends and options.
#[derive(Debug, Clone)]
pub struct Pipeline {
    backends: Backends,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(backends: Backends, config: PipelineConfig) -> Self {
        Self { backends, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Extract every page of `source` and assemble the document.
    pub fn run(&self, source: Arc<dyn RuleBackend>) -> Result<HierarchicalDocument> {
        self.config.validate()?;
        if self.config.llm_mode != LlmMode::Disabled && self.backends.llm.is_none() {
            log::debug!("LLM mode {:?} without an LLM backend", self.config.llm_mode);
        }

        let pages = source.pages();
        if pages.is_empty() {
            return Err(Error::EmptyDocument("document has no pages".to_string()));
        }
        log::info!("Extracting {} pages ({} backend)", pages.len(), source.name());

        let orchestrator = Orchestrator::new(&source, &self.backends, &self.config);
        let results: Vec<ExtractionResult> = if self.config.parallel && pages.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.max_workers)
                .thread_name(|i| format!("hybridpdf-page-{}", i))
                .build()
                .map_err(|e| Error::Other(format!("cannot build worker pool: {}", e)))?;
            pool.install(|| {
                pages
                    .par_iter()
                    .map(|page| orchestrator.extract_page(page))
                    .collect()
            })
        } else {
            pages.iter().map(|page| orchestrator.extract_page(page)).collect()
        };

        let document = assemble(source.info(), results);
        log::info!(
            "Assembled {} pages, {} incomplete",
            document.stats.page_count,
            document.stats.incomplete_pages
        );
        Ok(document)
    }
}
