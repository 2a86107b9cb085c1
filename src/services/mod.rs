//! External collaborators consulted by the forensic pipeline
//!
//! Each collaborator is a trait with one call method plus an HTTP client for
//! the hosted service behind it. The pipeline only ever sees the traits, so
//! tests swap in the scripted fakes from [`mock`].

pub mod deepfake;
pub mod metadata;
pub mod mock;
pub mod vision;

pub use deepfake::{AnomalyDetector, DetectionOutcome, HuggingFaceClient};
pub use metadata::{CloudinaryClient, CloudinaryCredentials, MetadataExtractor, MetadataFields};
pub use mock::{MockAnomalyDetector, MockMetadataExtractor, MockVisionReasoner};
pub use vision::{GeminiClient, VisionReasoner};

use crate::llm::{BackendError, LLMClient};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Builds the pooled HTTP client shared by one collaborator
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BackendError::ConfigurationError {
            message: format!("Failed to build HTTP client: {}", e),
        })
}

/// The set of collaborators injected into one pipeline
///
/// The vision reasoner is mandatory: it also performs the document scan for
/// text evidence. The others are only needed when their stage is enabled.
#[derive(Clone)]
pub struct Jury {
    pub vision: Arc<dyn VisionReasoner>,
    pub metadata: Option<Arc<dyn MetadataExtractor>>,
    pub deepfake: Option<Arc<dyn AnomalyDetector>>,
    pub logic: Option<Arc<dyn LLMClient>>,
}

impl Jury {
    pub fn new(vision: Arc<dyn VisionReasoner>) -> Self {
        Self {
            vision,
            metadata: None,
            deepfake: None,
            logic: None,
        }
    }

    pub fn with_metadata(mut self, extractor: Arc<dyn MetadataExtractor>) -> Self {
        self.metadata = Some(extractor);
        self
    }

    pub fn with_deepfake(mut self, detector: Arc<dyn AnomalyDetector>) -> Self {
        self.deepfake = Some(detector);
        self
    }

    pub fn with_logic(mut self, auditor: Arc<dyn LLMClient>) -> Self {
        self.logic = Some(auditor);
        self
    }
}

impl fmt::Debug for Jury {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jury")
            .field("vision", &self.vision.name())
            .field("metadata", &self.metadata.as_ref().map(|m| m.name().to_string()))
            .field("deepfake", &self.deepfake.as_ref().map(|d| d.name().to_string()))
            .field("logic", &self.logic.as_ref().map(|l| l.name().to_string()))
            .finish()
    }
}
