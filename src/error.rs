//! Error types for the clipboard bridge.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Clipboard bridge errors.
#[derive(Error, Debug)]
pub enum Error {
    /// No usable clipboard backend was detected at startup.
    #[error("No clipboard backend available")]
    NoBackendAvailable,

    /// A helper process exited nonzero or a toolkit call failed.
    #[error("{helper} failed: {stderr}")]
    BackendExecution {
        /// Helper program (or `toolkit`).
        helper: String,
        /// Captured standard error or toolkit message.
        stderr: String,
    },

    /// Toolkit fallback invoked without a default display.
    #[error("no default display available")]
    NoDisplay,

    /// Missing or incorrect API key.
    #[error("Invalid or missing API key")]
    Authentication,

    /// A helper process or toolkit job exceeded its bound.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout {
        /// What was running.
        operation: String,
        /// Configured bound.
        after: Duration,
    },

    /// Flattened backend failure, as seen by the HTTP layer.
    #[error("{cause}")]
    ClipboardOperation {
        /// Human-readable cause.
        cause: String,
        /// Set when the underlying failure was a timeout.
        timed_out: bool,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A remote bridge answered with a non-success status.
    #[error("bridge returned {status}: {detail}")]
    Bridge {
        /// HTTP status code.
        status: u16,
        /// `detail` or `error` field of the body, or the raw body.
        detail: String,
    },

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status used when this error crosses the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error came from an exceeded time bound.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } => true,
            Error::ClipboardOperation { timed_out, .. } => *timed_out,
            Error::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
