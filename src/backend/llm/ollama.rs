use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ImageRef;

use super::{http_client, map_send_error, LlmClient};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llava";

/// Ollama HTTP client for local inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: http_client(timeout)?,
            timeout,
        })
    }

    /// Default instance at localhost:11434.
    pub fn default_local(timeout: Duration) -> Result<Self> {
        Self::new(DEFAULT_OLLAMA_URL, DEFAULT_OLLAMA_MODEL, timeout)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, system: &str, prompt: &str, images: &[ImageRef]) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: "json",
            images: images
                .iter()
                .map(|img| base64::engine::general_purpose::STANDARD.encode(&img.data))
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::LlmUnavailable(format!(
                "Ollama returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| Error::LlmResponse(e.to_string()))?;
        Ok(parsed.response)
    }
}
