//! Vision and document reasoning through the Gemini `generateContent` API

use super::http_client;
use crate::llm::BackendError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[async_trait]
pub trait VisionReasoner: Send + Sync {
    /// Free-text analysis of an image under the given prompt
    async fn analyze_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, BackendError>;

    /// Free-text analysis of a plain text document under the given prompt
    async fn analyze_document(&self, prompt: &str, document: &str)
        -> Result<String, BackendError>;

    fn name(&self) -> &str;
}

pub struct GeminiClient {
    model: String,
    api_key: String,
    api_base: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        api_base: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            model: model.into(),
            api_key: api_key.into(),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            http_client: http_client(timeout)?,
            timeout,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String, BackendError> {
        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let start = Instant::now();
        let response = self
            .http_client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request error: {}", e);
                BackendError::from_reqwest("gemini", e, self.timeout.as_secs())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini returned error status {}: {}", status, body);
            return Err(BackendError::from_status("gemini", status.as_u16(), &body));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            BackendError::InvalidResponse {
                message: format!("gemini: JSON parse error: {}", e),
                raw_response: None,
            }
        })?;

        let text = body.text();
        if text.trim().is_empty() {
            let reason = body
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked ({})", r))
                .unwrap_or_else(|| "no text in response".to_string());
            return Err(BackendError::InvalidResponse {
                message: format!("gemini: {}", reason),
                raw_response: None,
            });
        }

        info!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gemini analysis complete"
        );
        Ok(text)
    }
}

#[async_trait]
impl VisionReasoner for GeminiClient {
    async fn analyze_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, BackendError> {
        debug!(bytes = image.len(), mime_type, "Sending image to Gemini");
        self.generate(vec![
            Part::Text {
                text: prompt.to_string(),
            },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: mime_type.to_string(),
                    data: BASE64.encode(image),
                },
            },
        ])
        .await
    }

    async fn analyze_document(
        &self,
        prompt: &str,
        document: &str,
    ) -> Result<String, BackendError> {
        debug!(chars = document.len(), "Sending document to Gemini");
        self.generate(vec![
            Part::Text {
                text: prompt.to_string(),
            },
            Part::Text {
                text: document.to_string(),
            },
        ])
        .await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(alias = "inlineData")]
        inline_data: InlineData,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(alias = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
