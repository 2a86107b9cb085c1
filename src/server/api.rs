use super::error::ServerError;
use crate::evidence::Evidence;
use crate::pipeline::ForensicPipeline;
use crate::report::{BinaryVerdict, VerdictReport};
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ForensicPipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<ForensicPipeline>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }
}

/// Response body of `POST /analyze`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Free text from the logic auditor; null when it did not produce one
    pub fraud_score: Option<String>,
    pub metadata_found: bool,
    pub verdict: BinaryVerdict,
}

impl From<&VerdictReport> for AnalyzeResponse {
    fn from(report: &VerdictReport) -> Self {
        Self {
            fraud_score: report.verdict.clone(),
            metadata_found: report.metadata_found(),
            verdict: report.binary_verdict(),
        }
    }
}

struct Upload {
    bytes: Vec<u8>,
    content_type: Option<String>,
    file_name: Option<String>,
}

pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ServerError> {
    let mut upload = None;
    let mut instruction = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                upload = Some(Upload {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            }
            "instruction" => instruction = Some(field.text().await?),
            other => debug!(field = other, "Ignoring multipart field"),
        }
    }

    let upload = upload.ok_or(ServerError::MissingFile)?;
    if upload.bytes.len() > state.max_upload_bytes {
        return Err(ServerError::PayloadTooLarge {
            limit: state.max_upload_bytes,
        });
    }

    let evidence = Evidence::from_upload(
        upload.bytes,
        upload.content_type.as_deref(),
        upload.file_name.as_deref(),
    )?;

    let report = state
        .pipeline
        .analyze(&evidence, instruction.as_deref())
        .await;

    let response = AnalyzeResponse::from(&report);
    info!(
        run_id = %report.run_id,
        verdict = %response.verdict,
        metadata_found = response.metadata_found,
        "Analysis served"
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{StageKind, StagePayload, StageResult};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn report(stages: Vec<StageResult>, verdict: Option<&str>) -> VerdictReport {
        VerdictReport {
            run_id: "run".to_string(),
            evidence_kind: "image".to_string(),
            evidence_sha256: String::new(),
            instruction: "Scan for fraud artifacts.".to_string(),
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            stages,
            verdict: verdict.map(str::to_string),
        }
    }

    #[test]
    fn test_response_from_flagged_report() {
        let mut fields = BTreeMap::new();
        fields.insert("Make".to_string(), serde_json::json!("Canon"));
        let report = report(
            vec![StageResult::ok(
                StageKind::Metadata,
                StagePayload::Fields(fields),
                Duration::ZERO,
            )],
            Some("Risk score 91. HIGH RISK of tampering."),
        );

        let response = AnalyzeResponse::from(&report);
        assert_eq!(
            response.fraud_score.as_deref(),
            Some("Risk score 91. HIGH RISK of tampering.")
        );
        assert!(response.metadata_found);
        assert_eq!(response.verdict, BinaryVerdict::Flagged);
    }

    #[test]
    fn test_response_without_verdict_is_clear() {
        let response = AnalyzeResponse::from(&report(Vec::new(), None));
        assert_eq!(response.fraud_score, None);
        assert!(!response.metadata_found);
        assert_eq!(response.verdict, BinaryVerdict::Clear);
    }

    #[test]
    fn test_response_json_shape() {
        let response = AnalyzeResponse::from(&report(Vec::new(), Some("low risk")));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "fraud_score": "low risk",
                "metadata_found": false,
                "verdict": "Clear"
            })
        );
    }
}
