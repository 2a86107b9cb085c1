//! Progress handler trait and events

use crate::report::{StageKind, StageStatus};
use std::time::Duration;

/// Events emitted while a pipeline run advances
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run accepted, no stage attempted yet
    RunStarted {
        run_id: String,
        evidence_kind: &'static str,
        evidence_bytes: usize,
    },

    /// A collaborator call is about to be issued
    StageStarted { run_id: String, stage: StageKind },

    /// A collaborator call returned (or failed)
    StageFinished {
        run_id: String,
        stage: StageKind,
        status: StageStatus,
        elapsed: Duration,
    },

    /// Every attempted stage has reported
    RunCompleted {
        run_id: String,
        stages: usize,
        verdict_set: bool,
        total_time: Duration,
    },
}

/// Receives progress events; implementations must not block
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
