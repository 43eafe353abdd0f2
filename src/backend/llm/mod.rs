//! LLM structuring backend.
//!
//! An [`LlmClient`] talks to a model service; [`LlmStructurer`] wraps one
//! into an [`LlmBackend`] that sends the page prompt and turns the answer
//! into elements.

mod gemini;
mod ollama;
pub mod prompt;
pub mod response;

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::ImageRef;

use super::{Fragment, LlmBackend, PageContent};

pub use gemini::{GeminiClient, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL};
pub use ollama::{OllamaClient, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};

/// Text generation against a model service.
pub trait LlmClient: Send + Sync {
    /// Provider label, e.g. "ollama".
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Send a system and user prompt with optional images; returns the raw answer.
    fn generate(&self, system: &str, prompt: &str, images: &[ImageRef]) -> Result<String>;
}

/// Supported model services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    Gemini,
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(Error::Config(format!("unknown LLM provider '{}'", other))),
        }
    }
}

/// Connection settings for an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    /// Model name; the provider default when `None`
    pub model: Option<String>,
    /// Service URL; the provider default when `None`
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn new(provider: LlmProvider) -> Self {
        Self {
            provider,
            model: None,
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Settings from `LLM_PROVIDER`, `LLM_MODEL`, `OLLAMA_HOST` and `GEMINI_API_KEY`.
    ///
    /// Returns `Ok(None)` when no provider is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let provider = match std::env::var("LLM_PROVIDER") {
            Ok(p) if !p.trim().is_empty() && p.trim() != "none" => p.parse::<LlmProvider>()?,
            _ => return Ok(None),
        };
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let mut settings = Self::new(provider);
        settings.model = var("LLM_MODEL");
        settings.api_key = var("GEMINI_API_KEY");
        if provider == LlmProvider::Ollama {
            settings.base_url = var("OLLAMA_HOST");
        }
        Ok(Some(settings))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create the client for these settings.
    pub fn build_client(&self) -> Result<Box<dyn LlmClient>> {
        match self.provider {
            LlmProvider::Ollama => Ok(Box::new(OllamaClient::new(
                self.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL),
                self.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL),
                self.timeout,
            )?)),
            LlmProvider::Gemini => {
                let client = GeminiClient::new(
                    self.api_key.as_deref().unwrap_or_default(),
                    self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL),
                    self.timeout,
                )?;
                Ok(Box::new(match &self.base_url {
                    Some(url) => client.with_base_url(url),
                    None => client,
                }))
            }
        }
    }
}

/// [`LlmBackend`] over any [`LlmClient`].
pub struct LlmStructurer {
    client: Box<dyn LlmClient>,
    name: String,
}

impl LlmStructurer {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        let name = format!("{}:{}", client.provider(), client.model());
        Self { client, name }
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Ok(Self::new(settings.build_client()?))
    }
}

impl LlmBackend for LlmStructurer {
    fn name(&self) -> &str {
        &self.name
    }

    fn structure_with_llm(&self, page: &PageContent, prompt: &str) -> Result<Fragment> {
        let images: Vec<ImageRef> = page
            .image
            .iter()
            .filter(|img| img.is_decodable())
            .cloned()
            .collect();

        log::debug!(
            "Page {}: asking {} ({} image(s))",
            page.page_number,
            self.name,
            images.len()
        );
        let raw = self.client.generate(prompt::SYSTEM_PROMPT, prompt, &images)?;
        Ok(Fragment::new(response::parse_response(&raw, &self.name)?))
    }
}

/// Blocking HTTP client with the request timeout applied.
fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::LlmUnavailable(format!("cannot create HTTP client: {}", e)))
}

fn map_send_error(e: reqwest::Error, base_url: &str, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::LlmTimeout(timeout)
    } else if e.is_connect() {
        Error::LlmUnavailable(format!("cannot connect to {}", base_url))
    } else {
        Error::LlmUnavailable(e.to_string())
    }
}
