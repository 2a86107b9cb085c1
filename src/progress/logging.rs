//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use crate::report::StageStatus;
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted {
                run_id,
                evidence_kind,
                evidence_bytes,
            } => {
                info!(
                    run_id = %run_id,
                    evidence = evidence_kind,
                    bytes = evidence_bytes,
                    "Starting forensic run"
                );
            }
            ProgressEvent::StageStarted { run_id, stage } => {
                debug!(run_id = %run_id, stage = %stage, "Stage started");
            }
            ProgressEvent::StageFinished {
                run_id,
                stage,
                status,
                elapsed,
            } => match status {
                StageStatus::Ok => info!(
                    run_id = %run_id,
                    stage = %stage,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Stage complete"
                ),
                StageStatus::Unavailable => warn!(
                    run_id = %run_id,
                    stage = %stage,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Stage pending: collaborator not ready"
                ),
                StageStatus::Error => warn!(
                    run_id = %run_id,
                    stage = %stage,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Stage failed"
                ),
            },
            ProgressEvent::RunCompleted {
                run_id,
                stages,
                verdict_set,
                total_time,
            } => {
                if *verdict_set {
                    info!(
                        run_id = %run_id,
                        stages,
                        total_time_ms = total_time.as_millis() as u64,
                        "Forensic run complete"
                    );
                } else {
                    warn!(
                        run_id = %run_id,
                        stages,
                        total_time_ms = total_time.as_millis() as u64,
                        "Forensic run partially complete: no verdict"
                    );
                }
            }
        }
    }
}
