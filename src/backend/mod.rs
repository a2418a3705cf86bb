//! Clipboard backends.
//!
//! Exactly one backend is selected at startup (see [`crate::probe`]) and
//! shared as an `Arc<dyn ClipboardBackend>` for the life of the service.

mod helper;
#[cfg(feature = "toolkit")]
mod toolkit;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::ClipboardContent;

pub use helper::{HelperBackend, HelperCommand, STDERR_LIMIT};
#[cfg(feature = "toolkit")]
pub use toolkit::ToolkitBackend;

/// Backend families, in probe preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// `wl-paste` / `wl-copy`.
    Wayland,
    /// `xclip` on the clipboard selection.
    X11Xclip,
    /// `xsel` on the clipboard selection.
    X11Xsel,
    /// In-process toolkit clipboard on a worker thread.
    ToolkitFallback,
    /// Nothing usable.
    None,
}

impl BackendKind {
    /// Name reported by `/` and `/health`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Wayland => "wayland",
            BackendKind::X11Xclip => "xclip",
            BackendKind::X11Xsel => "xsel",
            BackendKind::ToolkitFallback => "toolkit",
            BackendKind::None => "none",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read/write access to the system clipboard.
#[async_trait::async_trait]
pub trait ClipboardBackend: Send + Sync {
    /// Backend name for logs and status endpoints.
    fn name(&self) -> &str;

    /// Read the current clipboard content.
    async fn get(&self) -> Result<ClipboardContent>;

    /// Replace the clipboard content.
    async fn set(&self, content: &str, content_type: &str) -> Result<()>;
}

/// Backend used when the probe finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

#[async_trait::async_trait]
impl ClipboardBackend for UnavailableBackend {
    fn name(&self) -> &str {
        BackendKind::None.as_str()
    }

    async fn get(&self) -> Result<ClipboardContent> {
        Err(Error::NoBackendAvailable)
    }

    async fn set(&self, _content: &str, _content_type: &str) -> Result<()> {
        Err(Error::NoBackendAvailable)
    }
}

/// Instantiate the backend for a probed kind.
///
/// Only the toolkit fallback can fail here (its worker thread must spawn);
/// without the `toolkit` feature that kind degrades to [`UnavailableBackend`].
pub fn build(kind: BackendKind, timeout: Duration) -> Result<Arc<dyn ClipboardBackend>> {
    let backend: Arc<dyn ClipboardBackend> = match kind {
        BackendKind::Wayland => Arc::new(HelperBackend::wayland(timeout)),
        BackendKind::X11Xclip => Arc::new(HelperBackend::xclip(timeout)),
        BackendKind::X11Xsel => Arc::new(HelperBackend::xsel(timeout)),
        #[cfg(feature = "toolkit")]
        BackendKind::ToolkitFallback => Arc::new(ToolkitBackend::spawn(timeout)?),
        #[cfg(not(feature = "toolkit"))]
        BackendKind::ToolkitFallback => {
            tracing::warn!("toolkit backend requested but not compiled in");
            Arc::new(UnavailableBackend)
        }
        BackendKind::None => Arc::new(UnavailableBackend),
    };
    Ok(backend)
}
