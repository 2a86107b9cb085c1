//! Errors raised by external collaborators
//!
//! Shared by the chat client and the HTTP service clients. The pipeline never
//! propagates these; it records `to_string()` as the failing stage's payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur while calling a hosted service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendError {
    /// Service answered with a non-success status
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Credentials rejected by the service
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Response body could not be interpreted
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Client could not be constructed from the given settings
    ConfigurationError { message: String },

    /// Connection-level failure
    NetworkError { message: String },

    Other { message: String },
}

impl BackendError {
    /// Maps a reqwest transport error, keeping timeouts distinct
    pub fn from_reqwest(service: &str, error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            BackendError::TimeoutError {
                seconds: timeout_secs,
            }
        } else if error.is_connect() {
            BackendError::NetworkError {
                message: format!("{}: connection failed: {}", service, error),
            }
        } else if error.is_decode() {
            BackendError::InvalidResponse {
                message: format!("{}: {}", service, error),
                raw_response: None,
            }
        } else {
            BackendError::NetworkError {
                message: format!("{}: request failed: {}", service, error),
            }
        }
    }

    /// Maps a non-success HTTP status and its body
    pub fn from_status(service: &str, status: u16, body: &str) -> Self {
        let body: String = body.chars().take(500).collect();
        match status {
            401 | 403 => BackendError::AuthenticationError {
                message: format!("{} rejected credentials: {}", service, body),
            },
            _ => BackendError::ApiError {
                message: format!("{}: {}", service, body),
                status_code: Some(status),
            },
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::AuthenticationError { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}
