//! Wire types for the clipboard bridge REST API.
//!
//! Every clipboard operation answers with the same [`ClipboardResponse`]
//! envelope; fields that do not apply to an operation are omitted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// MIME type used when the caller does not provide one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.into()
}

/// Current time as an RFC 3339 timestamp.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Clipboard payload. The content type is opaque and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardContent {
    /// Text content.
    pub content: String,
    /// MIME type.
    #[serde(default = "default_content_type", alias = "contentType")]
    pub content_type: String,
}

impl ClipboardContent {
    /// Plain-text content.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: default_content_type(),
        }
    }

    /// Content with an explicit MIME type.
    pub fn with_type(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
        }
    }
}

/// Response envelope for get, set and clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Clipboard text (get only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// MIME type (get only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Human-readable outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClipboardResponse {
    /// Successful read carrying the clipboard content.
    pub fn retrieved(content: ClipboardContent) -> Self {
        Self {
            success: true,
            content: Some(content.content),
            content_type: Some(content.content_type),
            timestamp: timestamp(),
            message: Some("Clipboard content retrieved successfully".into()),
        }
    }

    /// Successful write or clear with no content.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            content: None,
            content_type: None,
            timestamp: timestamp(),
            message: Some(message.into()),
        }
    }
}

/// `GET /` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Always `running`.
    pub status: String,
    /// Active backend.
    pub backend: String,
    /// Endpoint map.
    pub endpoints: BTreeMap<String, String>,
}

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `healthy` when the service answers.
    pub status: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Active backend.
    pub backend: String,
}

impl HealthStatus {
    /// Health report for the given backend.
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".into(),
            timestamp: timestamp(),
            backend: backend.into(),
        }
    }
}

/// Error body for failed operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Operation and cause.
    pub detail: String,
}

/// Error body for rejected authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthError {
    /// Fixed message.
    pub error: String,
}
