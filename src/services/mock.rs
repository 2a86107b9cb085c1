//! Scripted collaborators for tests and offline runs
//!
//! Unlike [`MockLLMClient`](crate::llm::MockLLMClient), these return the same
//! scripted answer on every call, since each stage runs at most once per run.

use super::deepfake::{AnomalyDetector, DetectionOutcome};
use super::metadata::{MetadataExtractor, MetadataFields};
use super::vision::VisionReasoner;
use crate::llm::BackendError;
use crate::report::Classification;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct MockMetadataExtractor {
    result: Result<MetadataFields, BackendError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockMetadataExtractor {
    pub fn with_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        Self::scripted(Ok(fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()))
    }

    /// Image whose EXIF data was removed
    pub fn stripped() -> Self {
        Self::scripted(Ok(MetadataFields::new()))
    }

    pub fn failing(error: BackendError) -> Self {
        Self::scripted(Err(error))
    }

    fn scripted(result: Result<MetadataFields, BackendError>) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataExtractor for MockMetadataExtractor {
    async fn extract(&self, _image: &[u8], _mime_type: &str) -> Result<MetadataFields, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }

    fn name(&self) -> &str {
        "mock-metadata"
    }
}

pub struct MockAnomalyDetector {
    result: Result<DetectionOutcome, BackendError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockAnomalyDetector {
    pub fn classified<L: Into<String>>(labels: impl IntoIterator<Item = (L, f64)>) -> Self {
        Self::scripted(Ok(DetectionOutcome::Classified(
            labels
                .into_iter()
                .map(|(label, score)| Classification {
                    label: label.into(),
                    score,
                })
                .collect(),
        )))
    }

    /// Model reporting a cold start
    pub fn loading() -> Self {
        Self::scripted(Ok(DetectionOutcome::Pending {
            estimated_time: Some(20.0),
        }))
    }

    pub fn failing(error: BackendError) -> Self {
        Self::scripted(Err(error))
    }

    fn scripted(result: Result<DetectionOutcome, BackendError>) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnomalyDetector for MockAnomalyDetector {
    async fn detect(
        &self,
        _image: &[u8],
        _mime_type: &str,
    ) -> Result<DetectionOutcome, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }

    fn name(&self) -> &str {
        "mock-deepfake"
    }
}

/// Records every prompt and answers image and document scans separately
pub struct MockVisionReasoner {
    image_result: Result<String, BackendError>,
    document_result: Result<String, BackendError>,
    prompts: Mutex<Vec<String>>,
}

impl MockVisionReasoner {
    pub fn new() -> Self {
        Self::replying("No edits detected.")
    }

    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            image_result: Ok(text.clone()),
            document_result: Ok(text),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: BackendError) -> Self {
        Self {
            image_result: Err(error.clone()),
            document_result: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_document_reply(mut self, result: Result<String, BackendError>) -> Self {
        self.document_result = result;
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockVisionReasoner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionReasoner for MockVisionReasoner {
    async fn analyze_image(
        &self,
        prompt: &str,
        _image: &[u8],
        _mime_type: &str,
    ) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.image_result.clone()
    }

    async fn analyze_document(
        &self,
        prompt: &str,
        document: &str,
    ) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .unwrap()
            .push(format!("{}\n{}", prompt, document));
        self.document_result.clone()
    }

    fn name(&self) -> &str {
        "mock-vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metadata_mock_counts_calls() {
        let mock = MockMetadataExtractor::with_fields([("Make", "Nikon")]);
        let fields = mock.extract(b"img", "image/png").await.unwrap();
        assert_eq!(fields["Make"], serde_json::json!("Nikon"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_deepfake_mock_loading() {
        let mock = MockAnomalyDetector::loading();
        assert!(matches!(
            mock.detect(b"img", "image/png").await.unwrap(),
            DetectionOutcome::Pending { .. }
        ));
    }

    #[tokio::test]
    async fn test_vision_mock_records_prompts() {
        let mock = MockVisionReasoner::replying("edited")
            .with_document_reply(Ok("document ok".to_string()));
        assert_eq!(
            mock.analyze_image("find edits", b"img", "image/png").await.unwrap(),
            "edited"
        );
        assert_eq!(
            mock.analyze_document("summarize", "body").await.unwrap(),
            "document ok"
        );
        assert_eq!(mock.prompts(), vec!["find edits", "summarize\nbody"]);
    }
}
