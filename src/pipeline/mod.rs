//! Forensic jury pipeline
//!
//! Stage order: metadata and deepfake (concurrently), then vision, then the
//! logic audit. Text evidence skips straight to a single document scan.

pub mod orchestrator;
pub mod prompt;
pub mod stages;

pub use orchestrator::{ForensicPipeline, PipelineError};
pub use prompt::DEFAULT_INSTRUCTION;
pub use stages::{EnabledStages, UnknownStage};
