use crate::evidence::EvidenceError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Request-level failures of the HTTP surface
///
/// Stage failures never show up here; they are part of the report.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Missing multipart field 'file'")]
    MissingFile,

    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Multipart(e) => e.status(),
            ServerError::MissingFile => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Evidence(EvidenceError::Empty) => StatusCode::BAD_REQUEST,
            ServerError::Evidence(EvidenceError::UnsupportedEvidenceType { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "Rejected analyze request");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
