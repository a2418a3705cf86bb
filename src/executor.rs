//! Executor boundary between the HTTP layer and the selected backend.

use std::sync::Arc;

use crate::backend::ClipboardBackend;
use crate::error::{Error, Result};
use crate::protocol::{ClipboardContent, DEFAULT_CONTENT_TYPE};

/// Runs clipboard operations against the one active backend.
///
/// Backend errors are logged here and flattened into
/// [`Error::ClipboardOperation`]; nothing is retried.
#[derive(Clone)]
pub struct ClipboardExecutor {
    backend: Arc<dyn ClipboardBackend>,
}

impl ClipboardExecutor {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn ClipboardBackend>) -> Self {
        Self { backend }
    }

    /// Active backend name.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Read the clipboard.
    pub async fn get(&self) -> Result<ClipboardContent> {
        self.backend.get().await.map_err(|e| self.flatten("get", e))
    }

    /// Write the clipboard.
    pub async fn set(&self, content: &str, content_type: &str) -> Result<()> {
        tracing::debug!(
            backend = self.backend_name(),
            bytes = content.len(),
            content_type,
            "setting clipboard"
        );
        self.backend
            .set(content, content_type)
            .await
            .map_err(|e| self.flatten("set", e))
    }

    /// Empty the clipboard.
    pub async fn clear(&self) -> Result<()> {
        self.backend
            .set("", DEFAULT_CONTENT_TYPE)
            .await
            .map_err(|e| self.flatten("clear", e))
    }

    fn flatten(&self, operation: &str, err: Error) -> Error {
        tracing::error!(
            backend = self.backend_name(),
            operation,
            error = %err,
            "clipboard operation failed"
        );
        Error::ClipboardOperation {
            timed_out: err.is_timeout(),
            cause: err.to_string(),
        }
    }
}

impl std::fmt::Debug for ClipboardExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardExecutor")
            .field("backend", &self.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::UnavailableBackend;

    #[test]
    fn unavailable_backend_is_flattened() {
        let executor = ClipboardExecutor::new(Arc::new(UnavailableBackend));
        assert_eq!(executor.backend_name(), "none");

        let err = tokio_test::block_on(executor.get()).unwrap_err();
        assert!(matches!(err, Error::ClipboardOperation { timed_out: false, .. }));
        assert_eq!(err.to_string(), "No clipboard backend available");

        let err = tokio_test::block_on(executor.clear()).unwrap_err();
        assert!(!err.is_timeout());
    }

    #[test]
    fn debug_shows_backend_name() {
        let executor = ClipboardExecutor::new(Arc::new(UnavailableBackend));
        assert_eq!(
            format!("{executor:?}"),
            "ClipboardExecutor { backend: \"none\" }"
        );
    }
}
