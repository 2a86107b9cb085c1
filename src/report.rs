//! Stage results and the verdict report assembled from them

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Phrase whose case-insensitive presence in the logic verdict flags the run
///
/// This is a plain substring test. "not high risk" also flags.
pub const FLAG_MARKER: &str = "high risk";

/// Marker payload for a stage whose collaborator is still warming up
pub const PENDING_MARKER: &str = "pending";

/// External collaborator invoked by a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Metadata,
    Deepfake,
    Vision,
    Logic,
}

impl StageKind {
    /// All stages in invocation order
    pub const ALL: [StageKind; 4] = [
        StageKind::Metadata,
        StageKind::Deepfake,
        StageKind::Vision,
        StageKind::Logic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Metadata => "metadata",
            StageKind::Deepfake => "deepfake",
            StageKind::Vision => "vision",
            StageKind::Logic => "logic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "metadata" => Some(StageKind::Metadata),
            "deepfake" => Some(StageKind::Deepfake),
            "vision" => Some(StageKind::Vision),
            "logic" => Some(StageKind::Logic),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Ok,
    /// Collaborator reachable but not ready (model cold start)
    Unavailable,
    Error,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Ok => write!(f, "ok"),
            StageStatus::Unavailable => write!(f, "unavailable"),
            StageStatus::Error => write!(f, "error"),
        }
    }
}

/// One label returned by the anomaly detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

/// Stage output: opaque text or structured data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StagePayload {
    Text(String),
    /// Key/value fields such as camera EXIF data; empty when stripped
    Fields(BTreeMap<String, serde_json::Value>),
    Classifications(Vec<Classification>),
}

impl StagePayload {
    pub fn is_empty(&self) -> bool {
        match self {
            StagePayload::Text(text) => text.trim().is_empty(),
            StagePayload::Fields(fields) => fields.is_empty(),
            StagePayload::Classifications(labels) => labels.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StagePayload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Single-paragraph rendering used when embedding the payload in prompts
    pub fn summary(&self) -> String {
        match self {
            StagePayload::Text(text) => text.clone(),
            StagePayload::Fields(fields) if fields.is_empty() => {
                "no metadata (stripped)".to_string()
            }
            StagePayload::Fields(fields) => fields
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => format!("{}: {}", k, s),
                    other => format!("{}: {}", k, other),
                })
                .collect::<Vec<_>>()
                .join(", "),
            StagePayload::Classifications(labels) if labels.is_empty() => {
                "no classification".to_string()
            }
            StagePayload::Classifications(labels) => labels
                .iter()
                .map(|c| format!("{} ({:.1}%)", c.label, c.score * 100.0))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Recorded outcome of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageKind,
    pub status: StageStatus,
    pub payload: StagePayload,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl StageResult {
    pub fn ok(stage: StageKind, payload: StagePayload, elapsed: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Ok,
            payload,
            elapsed,
        }
    }

    pub fn pending(stage: StageKind, elapsed: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Unavailable,
            payload: StagePayload::Text(PENDING_MARKER.to_string()),
            elapsed,
        }
    }

    pub fn error(stage: StageKind, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stage,
            status: StageStatus::Error,
            payload: StagePayload::Text(message.into()),
            elapsed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StageStatus::Ok
    }
}

/// Binary classification of the final verdict text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryVerdict {
    Flagged,
    Clear,
}

impl BinaryVerdict {
    /// Flags when the marker phrase occurs anywhere, in any letter case
    pub fn classify(text: &str) -> Self {
        if text.to_lowercase().contains(FLAG_MARKER) {
            BinaryVerdict::Flagged
        } else {
            BinaryVerdict::Clear
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryVerdict::Flagged => "Flagged",
            BinaryVerdict::Clear => "Clear",
        }
    }
}

impl fmt::Display for BinaryVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictReport {
    pub run_id: String,
    pub evidence_kind: String,
    pub evidence_sha256: String,
    pub instruction: String,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// In invocation order, at most one per stage
    pub stages: Vec<StageResult>,
    /// Logic stage payload; unset when that stage failed or did not run
    pub verdict: Option<String>,
}

impl VerdictReport {
    pub fn stage(&self, kind: StageKind) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// True when the metadata stage succeeded with at least one field
    pub fn metadata_found(&self) -> bool {
        self.stage(StageKind::Metadata)
            .map(|s| s.is_ok() && !s.payload.is_empty())
            .unwrap_or(false)
    }

    /// Flagged/Clear per [`FLAG_MARKER`]; an unset verdict classifies as Clear
    pub fn binary_verdict(&self) -> BinaryVerdict {
        BinaryVerdict::classify(self.verdict.as_deref().unwrap_or_default())
    }

    /// Every attempted stage succeeded and the verdict is set
    pub fn is_complete(&self) -> bool {
        self.verdict.is_some() && self.stages.iter().all(StageResult::is_ok)
    }

    /// 0-100 risk score mentioned in the verdict, if any
    pub fn risk_score(&self) -> Option<u8> {
        self.verdict.as_deref().and_then(extract_risk_score)
    }
}

/// Pulls a 0-100 score out of free text
///
/// Recognises "score: 87", "87/100" and "87%". Values above 100 are ignored.
pub fn extract_risk_score(text: &str) -> Option<u8> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(?i)score\s*(?:of|is|:|=)?\s*\**\s*(\d{1,3})\b",
            r"\b(\d{1,3})\s*/\s*100\b",
            r"\b(\d{1,3})\s*%",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    patterns.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u8>().ok())
            .find(|score| *score <= 100)
    })
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
