//! Metadata extraction through Cloudinary
//!
//! The image is uploaded with `image_metadata=true`; Cloudinary answers with
//! the EXIF/IPTC fields it found. A stripped image yields an empty mapping,
//! which is a successful result rather than an error.

use super::http_client;
use crate::llm::BackendError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";

/// Camera/timestamp fields keyed by their EXIF names
pub type MetadataFields = BTreeMap<String, serde_json::Value>;

#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, image: &[u8], mime_type: &str) -> Result<MetadataFields, BackendError>;

    fn name(&self) -> &str;
}

/// Cloudinary account credentials
#[derive(Clone, PartialEq, Eq)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryCredentials {
    /// Parses `cloudinary://<api_key>:<api_secret>@<cloud_name>`
    pub fn from_url(url: &str) -> Option<Self> {
        let rest = url.trim().strip_prefix("cloudinary://")?;
        let (auth, cloud_name) = rest.rsplit_once('@')?;
        let (api_key, api_secret) = auth.split_once(':')?;
        let cloud_name = cloud_name.split(['/', '?']).next().unwrap_or_default();

        if api_key.is_empty() || api_secret.is_empty() || cloud_name.is_empty() {
            return None;
        }

        Some(Self {
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    /// Signs upload parameters: sorted `k=v` pairs joined by `&`, then the secret, SHA-1 hex
    pub fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<_> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

pub struct CloudinaryClient {
    credentials: CloudinaryCredentials,
    api_base: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl CloudinaryClient {
    pub fn new(
        credentials: CloudinaryCredentials,
        api_base: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            credentials,
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_CLOUDINARY_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            http_client: http_client(timeout)?,
            timeout,
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.api_base, self.credentials.cloud_name
        )
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    public_id: Option<String>,
    #[serde(default)]
    image_metadata: Option<MetadataFields>,
}

#[async_trait]
impl MetadataExtractor for CloudinaryClient {
    async fn extract(&self, image: &[u8], mime_type: &str) -> Result<MetadataFields, BackendError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [
            ("image_metadata", "true".to_string()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = self.credentials.sign(&params);

        let file = Part::bytes(image.to_vec())
            .file_name("evidence")
            .mime_str(mime_type)
            .map_err(|e| BackendError::ConfigurationError {
                message: format!("Invalid MIME type {}: {}", mime_type, e),
            })?;

        let form = Form::new()
            .part("file", file)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("image_metadata", "true")
            .text("signature", signature);

        debug!(bytes = image.len(), "Uploading evidence to Cloudinary");

        let response = self
            .http_client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Cloudinary request error: {}", e);
                BackendError::from_reqwest("cloudinary", e, self.timeout.as_secs())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Cloudinary returned error status {}: {}", status, body);
            return Err(BackendError::from_status("cloudinary", status.as_u16(), &body));
        }

        let upload: UploadResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Cloudinary response: {}", e);
            BackendError::InvalidResponse {
                message: format!("cloudinary: JSON parse error: {}", e),
                raw_response: None,
            }
        })?;

        let fields = upload.image_metadata.unwrap_or_default();
        info!(
            public_id = upload.public_id.as_deref().unwrap_or("-"),
            fields = fields.len(),
            "Cloudinary metadata scan complete"
        );

        Ok(fields)
    }

    fn name(&self) -> &str {
        "cloudinary"
    }
}

impl fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}
