//! truthlens - forensic jury for uploaded evidence
//!
//! An evidence artifact (an image or a text document) is sent through a jury
//! of hosted services and their findings are combined into one verdict:
//!
//! - **metadata**: Cloudinary upload with `image_metadata=true` (camera EXIF)
//! - **deepfake**: Hugging Face image classification
//! - **vision**: Gemini reasoning over the image (or the document text)
//! - **logic**: a Groq-hosted chat model auditing the vision findings
//!
//! The final verdict is the logic auditor's text. It is `Flagged` when the
//! text mentions "high risk" in any letter case and `Clear` otherwise.
//!
//! # Example Usage
//!
//! ```ignore
//! use truthlens::{Evidence, TruthLensConfig};
//!
//! async fn run(bytes: Vec<u8>) -> anyhow::Result<()> {
//!     let pipeline = TruthLensConfig::load()?.build_pipeline()?;
//!     let evidence = Evidence::from_upload(bytes, Some("image/jpeg"), None)?;
//!
//!     let report = pipeline
//!         .analyze(&evidence, Some("check for payment QR codes"))
//!         .await;
//!     println!("{}: {:?}", report.binary_verdict(), report.verdict);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod evidence;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod server;
pub mod services;
pub mod util;

pub use config::{ConfigError, TruthLensConfig};
pub use evidence::{Evidence, EvidenceError, ImageFormat};
pub use llm::{BackendError, GenAIClient, LLMClient, MockLLMClient};
pub use pipeline::{EnabledStages, ForensicPipeline, PipelineError};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use report::{
    BinaryVerdict, Classification, StageKind, StagePayload, StageResult, StageStatus,
    VerdictReport,
};
pub use server::{router, AnalyzeResponse, AppState};
pub use services::{AnomalyDetector, Jury, MetadataExtractor, VisionReasoner};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "truthlens");
    }
}
