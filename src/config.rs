//! Pipeline configuration.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default OCR language hint (Tesseract language code).
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Options controlling how each page is extracted.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// When the LLM structuring pass runs
    pub llm_mode: LlmMode,

    /// Language hints handed to the OCR backend
    pub ocr_languages: BTreeSet<String>,

    /// Upper bound for a single LLM call
    pub llm_timeout: Duration,

    /// Upper bound for a single rule/OCR/image-table call (None = unbounded)
    pub backend_timeout: Option<Duration>,

    /// Run OCR on native pages whose rule-based output is incomplete
    pub ocr_recovery: bool,

    /// Whether to process pages in parallel
    pub parallel: bool,

    /// Worker threads for parallel processing (0 = one per CPU)
    pub max_workers: usize,

    /// Alphanumeric characters the text probe must find for a page to count as native
    pub min_native_chars: usize,
}

impl PipelineConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the LLM fallback for incomplete pages.
    pub fn with_llm_fallback(mut self, enabled: bool) -> Self {
        self.llm_mode = if enabled {
            LlmMode::Fallback
        } else {
            LlmMode::Disabled
        };
        self
    }

    /// Run the LLM on every page, complete or not.
    pub fn force_llm(mut self) -> Self {
        self.llm_mode = LlmMode::Always;
        self
    }

    /// Set the LLM mode.
    pub fn with_llm_mode(mut self, mode: LlmMode) -> Self {
        self.llm_mode = mode;
        self
    }

    /// Replace the OCR language hints.
    pub fn with_ocr_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ocr_languages = languages
            .into_iter()
            .map(|l| {
                let l: String = l.into();
                l.trim().to_string()
            })
            .filter(|l| !l.is_empty())
            .collect();
        self
    }

    /// Set the LLM timeout in seconds.
    pub fn with_llm_timeout_secs(mut self, secs: u64) -> Self {
        self.llm_timeout = Duration::from_secs(secs);
        self
    }

    /// Set the LLM timeout.
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    /// Set the per-call timeout for non-LLM backends.
    pub fn with_backend_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Enable or disable OCR recovery on incomplete native pages.
    pub fn with_ocr_recovery(mut self, enabled: bool) -> Self {
        self.ocr_recovery = enabled;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the number of page workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Set the native classification threshold.
    pub fn with_min_native_chars(mut self, chars: usize) -> Self {
        self.min_native_chars = chars;
        self
    }

    /// Whether an incomplete page may fall back to the LLM.
    pub fn enable_llm_fallback(&self) -> bool {
        self.llm_mode != LlmMode::Disabled
    }

    /// OCR language hints in a stable order.
    pub fn languages(&self) -> Vec<String> {
        self.ocr_languages.iter().cloned().collect()
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.ocr_languages.is_empty() {
            return Err(Error::Config("at least one OCR language is required".into()));
        }
        if self.llm_timeout.is_zero() {
            return Err(Error::Config("LLM timeout must be greater than zero".into()));
        }
        if self.backend_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config(
                "backend timeout must be greater than zero".into(),
            ));
        }
        if self.min_native_chars == 0 {
            return Err(Error::Config(
                "native text threshold must be at least one character".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm_mode: LlmMode::Fallback,
            ocr_languages: BTreeSet::from([DEFAULT_OCR_LANGUAGE.to_string()]),
            llm_timeout: Duration::from_secs(120),
            backend_timeout: Some(Duration::from_secs(60)),
            ocr_recovery: true,
            parallel: true,
            max_workers: 0,
            min_native_chars: 10,
        }
    }
}

/// When the LLM structuring pass is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmMode {
    /// Never call the LLM
    Disabled,
    /// Call the LLM only for incomplete pages
    #[default]
    Fallback,
    /// Call the LLM for every page
    Always,
}
