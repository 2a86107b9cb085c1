//! Pixel-anomaly detection through the Hugging Face Inference API
//!
//! Hosted models are loaded on demand. While a model is cold the API answers
//! 503 with an `estimated_time`; that is reported as [`DetectionOutcome::Pending`]
//! so the pipeline can move on without waiting.

use super::http_client;
use crate::llm::BackendError;
use crate::report::Classification;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_HF_API_BASE: &str = "https://api-inference.huggingface.co";

#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// Labels with confidences, highest first
    Classified(Vec<Classification>),
    /// Model is still loading
    Pending { estimated_time: Option<f64> },
}

#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    async fn detect(&self, image: &[u8], mime_type: &str)
        -> Result<DetectionOutcome, BackendError>;

    fn name(&self) -> &str;
}

pub struct HuggingFaceClient {
    model: String,
    token: String,
    api_base: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HuggingFaceClient {
    pub fn new(
        model: impl Into<String>,
        token: impl Into<String>,
        api_base: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            model: model.into(),
            token: token.into(),
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_HF_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            http_client: http_client(timeout)?,
            timeout,
        })
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.api_base, self.model)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationBody {
    Flat(Vec<Classification>),
    Nested(Vec<Vec<Classification>>),
}

#[derive(Debug, Deserialize)]
struct LoadingBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    estimated_time: Option<f64>,
}

/// Recognises the cold-start answer: 503 with a loading message or an ETA
fn parse_loading(status: u16, body: &str) -> Option<DetectionOutcome> {
    if status != 503 {
        return None;
    }
    let parsed: LoadingBody = serde_json::from_str(body).ok()?;
    let loading = parsed.estimated_time.is_some()
        || parsed
            .error
            .as_deref()
            .map(|e| e.to_lowercase().contains("loading"))
            .unwrap_or(false);

    loading.then_some(DetectionOutcome::Pending {
        estimated_time: parsed.estimated_time,
    })
}

fn parse_classifications(body: &str) -> Result<Vec<Classification>, BackendError> {
    let parsed: ClassificationBody =
        serde_json::from_str(body).map_err(|e| BackendError::InvalidResponse {
            message: format!("huggingface: unexpected classification payload: {}", e),
            raw_response: Some(body.chars().take(200).collect()),
        })?;

    let mut labels = match parsed {
        ClassificationBody::Flat(labels) => labels,
        ClassificationBody::Nested(batches) => batches.into_iter().flatten().collect(),
    };
    labels.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(labels)
}

#[async_trait]
impl AnomalyDetector for HuggingFaceClient {
    async fn detect(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<DetectionOutcome, BackendError> {
        debug!(model = %self.model, bytes = image.len(), "Sending image to Hugging Face");

        let response = self
            .http_client
            .post(self.model_url())
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| {
                error!("Hugging Face request error: {}", e);
                BackendError::from_reqwest("huggingface", e, self.timeout.as_secs())
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            BackendError::from_reqwest("huggingface", e, self.timeout.as_secs())
        })?;

        if let Some(pending) = parse_loading(status, &body) {
            warn!(model = %self.model, "Deepfake model is loading; stage pending");
            return Ok(pending);
        }

        if !(200..300).contains(&status) {
            error!("Hugging Face returned error status {}: {}", status, body);
            return Err(BackendError::from_status("huggingface", status, &body));
        }

        let labels = parse_classifications(&body)?;
        info!(
            model = %self.model,
            top = labels.first().map(|l| l.label.as_str()).unwrap_or("-"),
            "Deepfake classification complete"
        );
        Ok(DetectionOutcome::Classified(labels))
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

impl fmt::Debug for HuggingFaceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceClient")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}
