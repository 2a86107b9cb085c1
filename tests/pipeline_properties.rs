//! Behavioural tests for the forensic pipeline
//!
//! Every collaborator is a scripted fake, so these tests pin down stage
//! ordering, degradation and verdict derivation without network access.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use truthlens::llm::{MockLLMClient, MockResponse};
use truthlens::services::{MockAnomalyDetector, MockMetadataExtractor, MockVisionReasoner};
use truthlens::{
    BackendError, BinaryVerdict, EnabledStages, Evidence, ForensicPipeline, ImageFormat, Jury,
    PipelineError, ProgressEvent, ProgressHandler, StageKind, StagePayload, StageStatus,
};

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn image() -> Evidence {
    Evidence::image(JPEG_BYTES.to_vec(), ImageFormat::Jpeg)
}

struct Fakes {
    metadata: Arc<MockMetadataExtractor>,
    deepfake: Arc<MockAnomalyDetector>,
    vision: Arc<MockVisionReasoner>,
    logic: Arc<MockLLMClient>,
}

impl Fakes {
    fn new() -> Self {
        Self {
            metadata: Arc::new(MockMetadataExtractor::with_fields([
                ("Make", "Canon"),
                ("DateTimeOriginal", "2024:03:01 10:22:41"),
            ])),
            deepfake: Arc::new(MockAnomalyDetector::classified([
                ("Realism", 0.93),
                ("Deepfake", 0.07),
            ])),
            vision: Arc::new(MockVisionReasoner::replying(
                "Font weight on the total differs from the line items.",
            )),
            logic: Arc::new(logic_replying("Risk score: 35. Minor inconsistencies only.")),
        }
    }

    fn jury(&self) -> Jury {
        Jury::new(self.vision.clone())
            .with_metadata(self.metadata.clone())
            .with_deepfake(self.deepfake.clone())
            .with_logic(self.logic.clone())
    }

    fn pipeline(&self, stages: EnabledStages) -> ForensicPipeline {
        ForensicPipeline::new(self.jury(), stages).unwrap()
    }
}

fn logic_replying(text: &str) -> MockLLMClient {
    let client = MockLLMClient::new();
    client.add_response(MockResponse::text(text));
    client
}

fn stage_order(report: &truthlens::VerdictReport) -> Vec<StageKind> {
    report.stages.iter().map(|s| s.stage).collect()
}

#[tokio::test]
async fn test_all_stages_run_in_fixed_order() {
    let fakes = Fakes::new();
    let report = fakes
        .pipeline(EnabledStages::all())
        .analyze(&image(), None)
        .await;

    assert_eq!(
        stage_order(&report),
        vec![
            StageKind::Metadata,
            StageKind::Deepfake,
            StageKind::Vision,
            StageKind::Logic
        ]
    );
    assert!(report.stages.iter().all(|s| s.status == StageStatus::Ok));

    let logic = report.stage(StageKind::Logic).unwrap();
    assert_eq!(report.verdict.as_deref(), logic.payload.as_text());
    assert_eq!(
        report.verdict.as_deref(),
        Some("Risk score: 35. Minor inconsistencies only.")
    );
    assert!(report.is_complete());
    assert!(report.metadata_found());
    assert_eq!(report.risk_score(), Some(35));
}

#[tokio::test]
async fn test_each_stage_called_exactly_once() {
    let fakes = Fakes::new();
    fakes
        .pipeline(EnabledStages::all())
        .analyze(&image(), None)
        .await;

    assert_eq!(fakes.metadata.call_count(), 1);
    assert_eq!(fakes.deepfake.call_count(), 1);
    assert_eq!(fakes.vision.call_count(), 1);
    assert_eq!(fakes.logic.call_count(), 1);
}

#[tokio::test]
async fn test_disabled_stages_are_not_reported() {
    let fakes = Fakes::new();
    let report = fakes
        .pipeline(EnabledStages::only([StageKind::Vision, StageKind::Logic]))
        .analyze(&image(), None)
        .await;

    assert_eq!(stage_order(&report), vec![StageKind::Vision, StageKind::Logic]);
    assert_eq!(fakes.metadata.call_count(), 0);
    assert_eq!(fakes.deepfake.call_count(), 0);
    assert!(!report.metadata_found());
}

#[tokio::test]
async fn test_text_evidence_runs_a_single_reasoning_stage() {
    for stages in [
        EnabledStages::all(),
        EnabledStages::only([StageKind::Metadata]),
        EnabledStages::only([StageKind::Vision]),
        EnabledStages::none(),
    ] {
        let fakes = Fakes::new();
        let vision = Arc::new(
            MockVisionReasoner::replying("unused")
                .with_document_reply(Ok("Payee name changed. HIGH RISK.".to_string())),
        );
        let jury = Jury::new(vision.clone())
            .with_metadata(fakes.metadata.clone())
            .with_deepfake(fakes.deepfake.clone())
            .with_logic(fakes.logic.clone());
        let pipeline = ForensicPipeline::new(jury, stages.clone()).unwrap();

        let report = pipeline
            .analyze(&Evidence::text("Invoice #42\nPay to: ACME Ltd"), None)
            .await;

        assert_eq!(stage_order(&report), vec![StageKind::Logic], "stages: {}", stages);
        assert_eq!(report.evidence_kind, "text");
        assert_eq!(vision.call_count(), 1);
        assert_eq!(fakes.metadata.call_count(), 0);
        assert_eq!(fakes.deepfake.call_count(), 0);
        assert_eq!(fakes.logic.call_count(), 0);
        assert_eq!(report.binary_verdict(), BinaryVerdict::Flagged);
    }
}

#[tokio::test]
async fn test_document_prompt_carries_instruction_and_content() {
    let vision = Arc::new(MockVisionReasoner::new());
    let pipeline = ForensicPipeline::new(Jury::new(vision.clone()), EnabledStages::none()).unwrap();

    pipeline
        .analyze(
            &Evidence::text("Wire 9,800 EUR to IBAN DE89 3704"),
            Some("summarise the payment request"),
        )
        .await;

    let prompts = vision.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("summarise the payment request"));
    assert!(prompts[0].contains("Wire 9,800 EUR"));
}

#[tokio::test]
async fn test_marker_phrase_in_any_case_flags() {
    for text in [
        "This is High RISK.",
        "HIGH risk: QR sticker over original",
        "verdict: high risk",
        "Overall: hIgH rIsK (score 92)",
    ] {
        let fakes = Fakes {
            logic: Arc::new(logic_replying(text)),
            ..Fakes::new()
        };
        let report = fakes
            .pipeline(EnabledStages::default())
            .analyze(&image(), None)
            .await;
        assert_eq!(report.binary_verdict(), BinaryVerdict::Flagged, "text: {}", text);
    }
}

#[tokio::test]
async fn test_absent_marker_is_clear() {
    for text in [
        "Low risk. Receipt appears genuine.",
        "Risk: high. Recommend review.",
        "highrisk",
    ] {
        let fakes = Fakes {
            logic: Arc::new(logic_replying(text)),
            ..Fakes::new()
        };
        let report = fakes
            .pipeline(EnabledStages::default())
            .analyze(&image(), None)
            .await;
        assert_eq!(report.binary_verdict(), BinaryVerdict::Clear, "text: {}", text);
    }
}

#[tokio::test]
async fn test_stripped_metadata_is_ok_and_not_found() {
    let fakes = Fakes {
        metadata: Arc::new(MockMetadataExtractor::stripped()),
        ..Fakes::new()
    };
    let report = fakes
        .pipeline(EnabledStages::default())
        .analyze(&image(), None)
        .await;

    let metadata = report.stage(StageKind::Metadata).unwrap();
    assert_eq!(metadata.status, StageStatus::Ok);
    assert!(metadata.payload.is_empty());
    assert_eq!(metadata.payload, StagePayload::Fields(Default::default()));
    assert!(!report.metadata_found());
}

#[tokio::test]
async fn test_deepfake_timeout_does_not_affect_later_stages() {
    let baseline = Fakes::new();
    let baseline_report = baseline
        .pipeline(EnabledStages::all())
        .analyze(&image(), None)
        .await;

    let fakes = Fakes {
        deepfake: Arc::new(MockAnomalyDetector::failing(BackendError::TimeoutError {
            seconds: 60,
        })),
        ..Fakes::new()
    };
    let report = fakes
        .pipeline(EnabledStages::all())
        .analyze(&image(), None)
        .await;

    let deepfake = report.stage(StageKind::Deepfake).unwrap();
    assert_eq!(deepfake.status, StageStatus::Error);
    assert_eq!(
        deepfake.payload.as_text(),
        Some("Request timed out after 60 seconds")
    );

    for kind in [StageKind::Vision, StageKind::Logic] {
        let stage = report.stage(kind).unwrap();
        assert_eq!(stage.status, StageStatus::Ok);
        assert_eq!(stage.payload, baseline_report.stage(kind).unwrap().payload);
    }
    assert_eq!(report.verdict, baseline_report.verdict);
    assert!(!report.is_complete());
}

#[tokio::test]
async fn test_deepfake_cold_start_is_pending() {
    let fakes = Fakes {
        deepfake: Arc::new(MockAnomalyDetector::loading()),
        ..Fakes::new()
    };
    let report = fakes
        .pipeline(EnabledStages::all())
        .analyze(&image(), None)
        .await;

    let deepfake = report.stage(StageKind::Deepfake).unwrap();
    assert_eq!(deepfake.status, StageStatus::Unavailable);
    assert_eq!(deepfake.payload.as_text(), Some("pending"));
    assert!(report.verdict.is_some());
}

#[tokio::test]
async fn test_logic_failure_leaves_verdict_unset() {
    let logic = MockLLMClient::new();
    logic.add_response(MockResponse::error(BackendError::ApiError {
        message: "Groq: 503 Service Unavailable".to_string(),
        status_code: Some(503),
    }));
    let fakes = Fakes {
        logic: Arc::new(logic),
        ..Fakes::new()
    };

    let report = fakes
        .pipeline(EnabledStages::all())
        .analyze(&image(), None)
        .await;

    let logic = report.stage(StageKind::Logic).unwrap();
    assert_eq!(logic.status, StageStatus::Error);
    assert!(logic
        .payload
        .as_text()
        .unwrap()
        .contains("503 Service Unavailable"));
    assert!(report.verdict.is_none());
    assert_eq!(report.binary_verdict(), BinaryVerdict::Clear);
    assert!(!report.is_complete());
    assert_eq!(report.stages.len(), 4);
}

#[tokio::test]
async fn test_vision_failure_still_runs_logic() {
    let fakes = Fakes {
        vision: Arc::new(MockVisionReasoner::failing(BackendError::NetworkError {
            message: "Gemini: connection failed".to_string(),
        })),
        ..Fakes::new()
    };
    let report = fakes
        .pipeline(EnabledStages::default())
        .analyze(&image(), None)
        .await;

    assert_eq!(
        report.stage(StageKind::Vision).unwrap().status,
        StageStatus::Error
    );
    assert_eq!(report.stage(StageKind::Logic).unwrap().status, StageStatus::Ok);

    let requests = fakes.logic.requests();
    let prompt = requests[0].last_user_content().unwrap_or_default();
    assert!(prompt.contains("unavailable"));
}

#[tokio::test]
async fn test_logic_prompt_embeds_earlier_findings() {
    let fakes = Fakes::new();
    fakes
        .pipeline(EnabledStages::all())
        .analyze(&image(), Some("check the merchant name"))
        .await;

    let requests = fakes.logic.requests();
    assert_eq!(requests.len(), 1);
    let prompt = requests[0].last_user_content().unwrap_or_default();
    assert!(prompt.contains("Font weight on the total differs from the line items."));
    assert!(prompt.contains("check the merchant name"));
    assert!(prompt.contains("Make: Canon"));
    assert!(prompt.contains("Realism"));
}

#[tokio::test]
async fn test_vision_prompt_does_not_depend_on_earlier_stages() {
    let stripped = Fakes {
        metadata: Arc::new(MockMetadataExtractor::stripped()),
        ..Fakes::new()
    };
    let rich = Fakes::new();

    for fakes in [&stripped, &rich] {
        fakes
            .pipeline(EnabledStages::all())
            .analyze(&image(), Some("check for payment QR codes"))
            .await;
    }

    assert_eq!(stripped.vision.prompts(), rich.vision.prompts());
    assert!(rich.vision.prompts()[0].contains("check for payment QR codes"));
}

#[tokio::test]
async fn test_blank_instruction_uses_default() {
    let fakes = Fakes::new();
    let report = fakes
        .pipeline(EnabledStages::default())
        .analyze(&image(), Some("   "))
        .await;
    assert_eq!(report.instruction, "Scan for fraud artifacts.");

    let fakes = Fakes::new();
    let pipeline = fakes
        .pipeline(EnabledStages::default())
        .with_default_instruction("Look for altered totals.");
    let report = pipeline.analyze(&image(), None).await;
    assert_eq!(report.instruction, "Look for altered totals.");
}

#[tokio::test]
async fn test_metadata_and_deepfake_run_concurrently() {
    let delay = Duration::from_millis(300);
    let fakes = Fakes {
        metadata: Arc::new(MockMetadataExtractor::stripped().with_delay(delay)),
        deepfake: Arc::new(MockAnomalyDetector::classified([("Realism", 0.9)]).with_delay(delay)),
        ..Fakes::new()
    };

    let report = fakes
        .pipeline(EnabledStages::all())
        .analyze(&image(), None)
        .await;

    assert!(report.elapsed < delay * 2);
    assert_eq!(report.stages.len(), 4);
}

#[tokio::test]
async fn test_run_rejects_stage_without_collaborator() {
    let vision = Arc::new(MockVisionReasoner::new());
    let pipeline =
        ForensicPipeline::new(Jury::new(vision.clone()), EnabledStages::only([StageKind::Vision]))
            .unwrap();

    let err = pipeline
        .run(&image(), None, &EnabledStages::only([StageKind::Deepfake]))
        .await
        .unwrap_err();

    assert_eq!(err, PipelineError::MissingCollaborator(StageKind::Deepfake));
    assert_eq!(vision.call_count(), 0);
}

#[tokio::test]
async fn test_run_with_explicit_subset() {
    let fakes = Fakes::new();
    let pipeline = fakes.pipeline(EnabledStages::all());

    let report = pipeline
        .run(&image(), None, &EnabledStages::only([StageKind::Metadata]))
        .await
        .unwrap();

    assert_eq!(stage_order(&report), vec![StageKind::Metadata]);
    assert!(report.verdict.is_none());
}

struct RecordingHandler {
    events: Mutex<Vec<String>>,
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        let line = match event {
            ProgressEvent::RunStarted { evidence_kind, .. } => format!("start:{}", evidence_kind),
            ProgressEvent::StageStarted { stage, .. } => format!("begin:{}", stage),
            ProgressEvent::StageFinished { stage, status, .. } => format!("end:{}:{}", stage, status),
            ProgressEvent::RunCompleted { verdict_set, .. } => format!("done:{}", verdict_set),
        };
        self.events.lock().unwrap().push(line);
    }
}

#[tokio::test]
async fn test_progress_events_bracket_each_stage() {
    let handler = Arc::new(RecordingHandler {
        events: Mutex::new(Vec::new()),
    });
    let fakes = Fakes::new();
    fakes
        .pipeline(EnabledStages::only([StageKind::Vision, StageKind::Logic]))
        .with_progress(handler.clone())
        .analyze(&image(), None)
        .await;

    assert_eq!(
        *handler.events.lock().unwrap(),
        vec![
            "start:image",
            "begin:vision",
            "end:vision:ok",
            "begin:logic",
            "end:logic:ok",
            "done:true",
        ]
    );
}

/// Stripped photo, QR instruction, HTTP-variant jury
#[tokio::test]
async fn test_stripped_photo_qr_scenario() {
    let fakes = Fakes {
        metadata: Arc::new(MockMetadataExtractor::stripped()),
        vision: Arc::new(MockVisionReasoner::replying(
            "A QR code sticker sits on top of the printed payment code; edges are misaligned.",
        )),
        logic: Arc::new(logic_replying(
            "Risk score: 91/100. HIGH RISK: the payment QR code appears to be replaced.",
        )),
        ..Fakes::new()
    };

    let report = fakes
        .pipeline(EnabledStages::only([
            StageKind::Metadata,
            StageKind::Vision,
            StageKind::Logic,
        ]))
        .analyze(&image(), Some("check for payment QR codes"))
        .await;

    assert_eq!(
        stage_order(&report),
        vec![StageKind::Metadata, StageKind::Vision, StageKind::Logic]
    );

    let metadata = report.stage(StageKind::Metadata).unwrap();
    assert_eq!(metadata.status, StageStatus::Ok);
    assert!(metadata.payload.is_empty());
    assert!(!report.metadata_found());

    let vision = report.stage(StageKind::Vision).unwrap();
    assert!(vision.payload.as_text().unwrap().contains("QR code"));
    assert!(fakes.vision.prompts()[0].contains("check for payment QR codes"));

    assert_eq!(report.risk_score(), Some(91));
    assert_eq!(report.binary_verdict(), BinaryVerdict::Flagged);
    assert_eq!(report.instruction, "check for payment QR codes");
    assert_eq!(report.evidence_sha256, image().fingerprint());
}
