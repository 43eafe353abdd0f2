use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ImageRef;

use super::{http_client, map_send_error, LlmClient};

pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl GeminiClient {
    /// Fails with `LlmUnavailable` when the API key is empty.
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::LlmUnavailable("GEMINI_API_KEY is not set".to_string()));
        }
        Ok(Self {
            base_url: DEFAULT_GEMINI_URL.to_string(),
            model: model.to_string(),
            api_key: api_key.trim().to_string(),
            client: http_client(timeout)?,
            timeout,
        })
    }

    /// Point at a different endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn build_request<'a>(system: &'a str, prompt: &'a str, images: &[ImageRef]) -> GenerateRequest<'a> {
    let mut parts = vec![Part::Text { text: prompt }];
    parts.extend(images.iter().map(|img| Part::Inline {
        inline_data: InlineData {
            mime_type: img.mime_type.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(&img.data),
        },
    }));

    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text { text: system }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
        },
    }
}

impl LlmClient for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, system: &str, prompt: &str, images: &[ImageRef]) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = build_request(system, prompt, images);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| map_send_error(e, &self.base_url, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::LlmUnavailable(format!(
                "Gemini returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| Error::LlmResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(Error::LlmResponse("Gemini returned no candidates".to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(
            GeminiClient::new("  ", DEFAULT_GEMINI_MODEL, Duration::from_secs(5)),
            Err(Error::LlmUnavailable(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let image = ImageRef::new("p1_raster", "image/png", vec![1, 2, 3]);
        let body = build_request("sys", "prompt", &[image]);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_response_deserialization() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "{\"elements\": []}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let part = &parsed.candidates[0].content.as_ref().unwrap().parts[0];
        assert_eq!(part.text, "{\"elements\": []}");
    }
}
