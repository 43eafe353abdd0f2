//! Per-page extraction: classify, run the strategy's steps, check
//! completeness, recover with OCR and fall back to the LLM.

use std::sync::Arc;

use crate::backend::llm::prompt::build_page_prompt;
use crate::backend::{Backends, ImageInput, PageContent, RuleBackend};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::model::{
    Classification, Element, ElementKind, ExtractionResult, Origin, PageHandle, PageIssue,
};

use super::classifier::classify;
use super::completeness::{assess, Assessment, Signals};
use super::merge::merge;
use super::strategy::{llm_decision, Step, Strategy};
use super::timeout::{call_backend, call_llm};

/// Page raster, rendered at most once per page.
enum Raster {
    NotTried,
    Ready(ImageInput),
    Failed,
}

/// Mutable state while one page is extracted.
struct PageState {
    elements: Vec<Element>,
    issues: Vec<PageIssue>,
    signals: Signals,
    raster: Raster,
}

impl PageState {
    fn new() -> Self {
        Self {
            elements: Vec::new(),
            issues: Vec::new(),
            signals: Signals::default(),
            raster: Raster::NotTried,
        }
    }

    fn absorb(&mut self, incoming: Vec<Element>) {
        self.signals.blank_text += incoming
            .iter()
            .filter(|e| e.kind == ElementKind::Text && e.is_empty())
            .count();
        let stats = merge(&mut self.elements, incoming);
        log::trace!("merge: {:?}", stats);
    }

    fn has_failures(&self) -> bool {
        self.issues.iter().any(PageIssue::is_failure)
    }

    fn is_complete(&self, assessment: &Assessment) -> bool {
        assessment.is_complete() && !self.has_failures()
    }
}

/// Drives extraction for single pages of one document.
pub struct Orchestrator<'a> {
    source: &'a Arc<dyn RuleBackend>,
    backends: &'a Backends,
    config: &'a PipelineConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(source: &'a Arc<dyn RuleBackend>, backends: &'a Backends, config: &'a PipelineConfig) -> Self {
        Self {
            source,
            backends,
            config,
        }
    }

    /// Extract one page. Backend errors become page issues; this never fails.
    pub fn extract_page(&self, page: &PageHandle) -> ExtractionResult {
        let (classification, probe_issue) = classify(self.source, page, self.config);
        let mut state = PageState::new();
        state.issues.extend(probe_issue);

        let strategy = Strategy::for_classification(classification);
        for step in strategy.steps() {
            self.run_step(*step, page, &mut state);
        }
        let mut assessment = assess(&state.elements, &state.signals);

        if classification == Classification::Native
            && !state.is_complete(&assessment)
            && self.config.ocr_recovery
            && self.backends.ocr.is_some()
        {
            log::debug!("Page {}: native extraction incomplete, trying OCR", page.number);
            self.recover_with_ocr(page, &mut state);
            assessment = assess(&state.elements, &state.signals);
        }

        let mut llm_invoked = false;
        if llm_decision(self.config.llm_mode, state.is_complete(&assessment)) {
            llm_invoked = self.run_llm(page, &mut state);
            assessment = assess(&state.elements, &state.signals);
        }

        let complete = state.is_complete(&assessment);
        let mut issues = state.issues;
        issues.extend(assessment.reasons);

        log::debug!(
            "Page {}: {} elements, complete={}, llm={}",
            page.number,
            state.elements.len(),
            complete,
            llm_invoked
        );

        ExtractionResult {
            page: *page,
            classification,
            elements: state.elements,
            complete,
            issues,
            llm_invoked,
        }
    }

    fn run_step(&self, step: Step, page: &PageHandle, state: &mut PageState) {
        match step {
            Step::NativeText => {
                let result = self.call_source(page, |s, p| s.extract_native_text(p));
                self.collect(self.source.name(), page, state, result);
            }
            Step::NativeTables => {
                let result = self.call_source(page, |s, p| s.extract_native_tables(p));
                self.collect(self.source.name(), page, state, result);
            }
            Step::Images => {
                let result = self.call_source(page, |s, p| s.extract_images(p));
                self.collect(self.source.name(), page, state, result);
            }
            Step::EmbeddedImageTables => {
                let Some(backend) = &self.backends.image_tables else {
                    return;
                };
                let inputs: Vec<ImageInput> = state
                    .elements
                    .iter()
                    .filter_map(|e| {
                        let image = e.as_image().filter(|img| img.is_decodable())?;
                        Some(ImageInput::new(image.clone(), e.region.unwrap_or_else(|| page.bounds())))
                    })
                    .collect();
                for input in inputs {
                    let backend_ref = Arc::clone(backend);
                    let result = call_backend(backend.name(), self.config.backend_timeout, move || {
                        backend_ref.extract_tables_from_image(&input)
                    });
                    self.collect_image_tables(backend.name(), page, state, result);
                }
            }
            Step::PageOcr => {
                let Some(ocr) = &self.backends.ocr else {
                    state.issues.push(PageIssue::BackendUnavailable {
                        backend: "ocr".to_string(),
                        message: "no OCR backend configured".to_string(),
                    });
                    return;
                };
                let Some(raster) = self.raster(page, state, true) else {
                    return;
                };
                let ocr_ref = Arc::clone(ocr);
                let languages = self.config.languages();
                let result = call_backend(ocr.name(), self.config.backend_timeout, move || {
                    ocr_ref.run_ocr(&raster, &languages)
                });
                self.collect(ocr.name(), page, state, result);
            }
            Step::PageImageTables => {
                let Some(backend) = &self.backends.image_tables else {
                    return;
                };
                let Some(raster) = self.raster(page, state, true) else {
                    return;
                };
                let backend_ref = Arc::clone(backend);
                let result = call_backend(backend.name(), self.config.backend_timeout, move || {
                    backend_ref.extract_tables_from_image(&raster)
                });
                self.collect_image_tables(backend.name(), page, state, result);
            }
            Step::PageSnapshot => {
                let Some(raster) = self.raster(page, state, false) else {
                    return;
                };
                let snapshot = Element::image(Origin::Rule, self.source.name(), raster.image)
                    .with_region(raster.region);
                state.absorb(vec![snapshot]);
            }
        }
    }

    /// OCR on a native page whose rule-based pass came up short.
    fn recover_with_ocr(&self, page: &PageHandle, state: &mut PageState) {
        let Some(ocr) = &self.backends.ocr else {
            return;
        };
        // Without pdfium a text-only page has nothing to rasterize; not a failure here
        let Some(raster) = self.raster(page, state, false) else {
            return;
        };
        let ocr_ref = Arc::clone(ocr);
        let languages = self.config.languages();
        let result = call_backend(ocr.name(), self.config.backend_timeout, move || {
            ocr_ref.run_ocr(&raster, &languages)
        });
        self.collect(ocr.name(), page, state, result);
    }

    /// Ask the LLM for missing content. Returns whether a call was made.
    fn run_llm(&self, page: &PageHandle, state: &mut PageState) -> bool {
        let Some(llm) = &self.backends.llm else {
            state.issues.push(PageIssue::LlmUnavailable {
                message: "no LLM backend configured".to_string(),
            });
            return false;
        };

        let image = self.raster(page, state, false).map(|r| r.image);
        let content = PageContent {
            page_number: page.number,
            width: page.width,
            height: page.height,
            text: state
                .elements
                .iter()
                .filter(|e| e.kind != ElementKind::Image)
                .map(Element::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            elements: state.elements.clone(),
            image,
        };
        let prompt = build_page_prompt(&content);

        log::debug!("Page {}: invoking LLM {}", page.number, llm.name());
        let llm_ref = Arc::clone(llm);
        let result = call_llm(llm.name(), self.config.llm_timeout, move || {
            llm_ref.structure_with_llm(&content, &prompt)
        });
        self.collect(llm.name(), page, state, result.map(|fragment| fragment.elements));
        true
    }

    /// The page raster, rendering it on first use.
    ///
    /// With `record` set, a render failure becomes a page issue.
    fn raster(&self, page: &PageHandle, state: &mut PageState, record: bool) -> Option<ImageInput> {
        match &state.raster {
            Raster::Ready(input) => return Some(input.clone()),
            Raster::Failed => return None,
            Raster::NotTried => {}
        }

        match self.call_source(page, |s, p| s.render_page(p)) {
            Ok(input) => {
                state.raster = Raster::Ready(input.clone());
                Some(input)
            }
            Err(e) => {
                state.raster = Raster::Failed;
                if record {
                    log::warn!("Page {}: cannot render page: {}", page.number, e);
                    state.issues.push(PageIssue::from_error(self.source.name(), &e));
                } else {
                    log::debug!("Page {}: no raster: {}", page.number, e);
                }
                None
            }
        }
    }

    /// Run a rule-backend call under the backend timeout.
    fn call_source<T, F>(&self, page: &PageHandle, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RuleBackend, &PageHandle) -> Result<T> + Send + 'static,
    {
        let source = Arc::clone(self.source);
        let handle = *page;
        call_backend(self.source.name(), self.config.backend_timeout, move || {
            f(source.as_ref(), &handle)
        })
    }

    fn collect(&self, backend: &str, page: &PageHandle, state: &mut PageState, result: Result<Vec<Element>>) {
        match result {
            Ok(elements) => state.absorb(elements),
            Err(e) => record_failure(backend, page, state, &e),
        }
    }

    fn collect_image_tables(
        &self,
        backend: &str,
        page: &PageHandle,
        state: &mut PageState,
        result: Result<Vec<Element>>,
    ) {
        match result {
            Ok(elements) => {
                state.signals.expected_tables += elements
                    .iter()
                    .filter(|e| e.kind == ElementKind::Table)
                    .count();
                state.absorb(elements);
            }
            // Image tables are an optional enrichment
            Err(Error::BackendUnavailable { reason, .. }) => {
                log::debug!("Page {}: image tables skipped: {}", page.number, reason);
            }
            Err(e) => record_failure(backend, page, state, &e),
        }
    }
}

fn record_failure(backend: &str, page: &PageHandle, state: &mut PageState, e: &Error) {
    log::warn!("Page {}: {} failed: {}", page.number, backend, e);
    state.issues.push(PageIssue::from_error(backend, e));
}
