use super::prompt::{self, DEFAULT_INSTRUCTION};
use super::stages::EnabledStages;
use crate::evidence::Evidence;
use crate::llm::{BackendError, ChatMessage, LLMRequest};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::report::{StageKind, StagePayload, StageResult, VerdictReport};
use crate::services::{DetectionOutcome, Jury};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

const LOGIC_TEMPERATURE: f32 = 0.2;
const LOGIC_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage was requested but no collaborator was configured for it
    #[error("Stage '{0}' is enabled but no collaborator is configured for it")]
    MissingCollaborator(StageKind),
}

/// Runs the jury over one evidence item
///
/// Metadata and deepfake scans are independent and run concurrently. The
/// vision scan follows, and the logic audit runs last because its prompt
/// embeds the vision findings. A failing stage is recorded and never stops
/// the stages after it.
pub struct ForensicPipeline {
    jury: Jury,
    stages: EnabledStages,
    default_instruction: String,
    progress: Arc<dyn ProgressHandler>,
}

impl ForensicPipeline {
    pub fn new(jury: Jury, stages: EnabledStages) -> Result<Self, PipelineError> {
        check_collaborators(&jury, &stages)?;
        Ok(Self {
            jury,
            stages,
            default_instruction: DEFAULT_INSTRUCTION.to_string(),
            progress: Arc::new(NoOpHandler),
        })
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = handler;
        self
    }

    pub fn with_default_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        if !instruction.trim().is_empty() {
            self.default_instruction = instruction;
        }
        self
    }

    pub fn enabled_stages(&self) -> &EnabledStages {
        &self.stages
    }

    /// Runs the configured stages
    pub async fn analyze(&self, evidence: &Evidence, instruction: Option<&str>) -> VerdictReport {
        self.execute(evidence, instruction, &self.stages).await
    }

    /// Runs an explicit stage subset
    ///
    /// Fails before any call is made when a requested image stage has no
    /// collaborator. Text evidence only ever needs the vision reasoner.
    pub async fn run(
        &self,
        evidence: &Evidence,
        instruction: Option<&str>,
        stages: &EnabledStages,
    ) -> Result<VerdictReport, PipelineError> {
        if matches!(evidence, Evidence::Image { .. }) {
            check_collaborators(&self.jury, stages)?;
        }
        Ok(self.execute(evidence, instruction, stages).await)
    }

    async fn execute(
        &self,
        evidence: &Evidence,
        instruction: Option<&str>,
        stages: &EnabledStages,
    ) -> VerdictReport {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let instruction = instruction
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(self.default_instruction.as_str())
            .to_string();

        self.progress.on_progress(&ProgressEvent::RunStarted {
            run_id: run_id.clone(),
            evidence_kind: evidence.kind(),
            evidence_bytes: evidence.len(),
        });

        let results = match evidence {
            Evidence::Image { bytes, mime_type } => {
                self.image_stages(&run_id, bytes, mime_type, &instruction, stages)
                    .await
            }
            Evidence::Text { content } => {
                vec![self.document_stage(&run_id, content, &instruction).await]
            }
        };

        let verdict = results
            .iter()
            .find(|r| r.stage == StageKind::Logic && r.is_ok())
            .and_then(|r| r.payload.as_text())
            .map(str::to_string);

        self.progress.on_progress(&ProgressEvent::RunCompleted {
            run_id: run_id.clone(),
            stages: results.len(),
            verdict_set: verdict.is_some(),
            total_time: start.elapsed(),
        });

        VerdictReport {
            run_id,
            evidence_kind: evidence.kind().to_string(),
            evidence_sha256: evidence.fingerprint(),
            instruction,
            started_at,
            elapsed: start.elapsed(),
            stages: results,
            verdict,
        }
    }

    async fn image_stages(
        &self,
        run_id: &str,
        bytes: &[u8],
        mime_type: &str,
        instruction: &str,
        stages: &EnabledStages,
    ) -> Vec<StageResult> {
        let metadata = async {
            match (&self.jury.metadata, stages.contains(StageKind::Metadata)) {
                (Some(extractor), true) => Some(
                    self.stage(run_id, StageKind::Metadata, async {
                        extractor
                            .extract(bytes, mime_type)
                            .await
                            .map(StagePayload::Fields)
                            .map(Some)
                    })
                    .await,
                ),
                _ => None,
            }
        };

        let deepfake = async {
            match (&self.jury.deepfake, stages.contains(StageKind::Deepfake)) {
                (Some(detector), true) => Some(
                    self.stage(run_id, StageKind::Deepfake, async {
                        detector
                            .detect(bytes, mime_type)
                            .await
                            .map(|outcome| match outcome {
                                DetectionOutcome::Classified(labels) => {
                                    Some(StagePayload::Classifications(labels))
                                }
                                DetectionOutcome::Pending { estimated_time } => {
                                    debug!(?estimated_time, "Deepfake model warming up");
                                    None
                                }
                            })
                    })
                    .await,
                ),
                _ => None,
            }
        };

        let (metadata, deepfake) = tokio::join!(metadata, deepfake);

        let vision = if stages.contains(StageKind::Vision) {
            let vision_prompt = prompt::vision_prompt(instruction);
            Some(
                self.stage(run_id, StageKind::Vision, async {
                    self.jury
                        .vision
                        .analyze_image(&vision_prompt, bytes, mime_type)
                        .await
                        .map(|text| Some(StagePayload::Text(text)))
                })
                .await,
            )
        } else {
            None
        };

        let logic = match (&self.jury.logic, stages.contains(StageKind::Logic)) {
            (Some(auditor), true) => {
                let logic_prompt = prompt::logic_prompt(
                    instruction,
                    vision.as_ref(),
                    metadata.as_ref(),
                    deepfake.as_ref(),
                );
                let request = LLMRequest::new(vec![
                    ChatMessage::system(prompt::AUDITOR_SYSTEM_PROMPT),
                    ChatMessage::user(logic_prompt),
                ])
                .with_temperature(LOGIC_TEMPERATURE)
                .with_max_tokens(LOGIC_MAX_TOKENS);

                Some(
                    self.stage(run_id, StageKind::Logic, async {
                        auditor
                            .chat(request)
                            .await
                            .map(|response| Some(StagePayload::Text(response.content)))
                    })
                    .await,
                )
            }
            _ => None,
        };

        [metadata, deepfake, vision, logic]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Text evidence gets exactly one reasoning call, recorded as the logic stage
    async fn document_stage(&self, run_id: &str, content: &str, instruction: &str) -> StageResult {
        let document_prompt = prompt::document_prompt(instruction);
        self.stage(run_id, StageKind::Logic, async {
            self.jury
                .vision
                .analyze_document(&document_prompt, content)
                .await
                .map(|text| Some(StagePayload::Text(text)))
        })
        .await
    }

    /// Times one collaborator call and folds its outcome into a stage result
    ///
    /// `Ok(None)` means the collaborator is not ready yet.
    async fn stage<F>(&self, run_id: &str, kind: StageKind, call: F) -> StageResult
    where
        F: Future<Output = Result<Option<StagePayload>, BackendError>>,
    {
        self.progress.on_progress(&ProgressEvent::StageStarted {
            run_id: run_id.to_string(),
            stage: kind,
        });

        let start = Instant::now();
        let outcome = call.await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(Some(payload)) => StageResult::ok(kind, payload, elapsed),
            Ok(None) => StageResult::pending(kind, elapsed),
            Err(e) => {
                info!(run_id, stage = %kind, error = %e, "Stage degraded to error");
                StageResult::error(kind, e.to_string(), elapsed)
            }
        };

        self.progress.on_progress(&ProgressEvent::StageFinished {
            run_id: run_id.to_string(),
            stage: kind,
            status: result.status,
            elapsed,
        });

        result
    }
}

fn check_collaborators(jury: &Jury, stages: &EnabledStages) -> Result<(), PipelineError> {
    let missing = stages.iter().find(|stage| match stage {
        StageKind::Metadata => jury.metadata.is_none(),
        StageKind::Deepfake => jury.deepfake.is_none(),
        StageKind::Vision => false,
        StageKind::Logic => jury.logic.is_none(),
    });

    match missing {
        Some(stage) => Err(PipelineError::MissingCollaborator(stage)),
        None => Ok(()),
    }
}

impl std::fmt::Debug for ForensicPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForensicPipeline")
            .field("jury", &self.jury)
            .field("stages", &self.stages.to_string())
            .field("default_instruction", &self.default_instruction)
            .finish()
    }
}
