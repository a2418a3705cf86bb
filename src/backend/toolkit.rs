//! Toolkit clipboard fallback.
//!
//! The toolkit handle is not usable from arbitrary async tasks, so a single
//! named worker thread owns it. Requests are sent over a channel and answered
//! on a oneshot the calling task awaits.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;

use super::{BackendKind, ClipboardBackend};
use crate::error::{Error, Result};
use crate::protocol::{ClipboardContent, DEFAULT_CONTENT_TYPE};

const WORKER_NAME: &str = "clipboard-toolkit";

enum Job {
    Read(oneshot::Sender<Result<String>>),
    Write(String, oneshot::Sender<Result<()>>),
}

/// Clipboard access through `arboard` on a dedicated thread.
pub struct ToolkitBackend {
    jobs: mpsc::Sender<Job>,
    timeout: Duration,
}

impl ToolkitBackend {
    /// Start the worker thread. The toolkit itself is initialized lazily on the
    /// first job.
    pub fn spawn(timeout: Duration) -> Result<Self> {
        Self::start(timeout, |queue| {
            worker_loop(queue, ToolkitSession::new(display_available))
        })
    }

    fn start<W>(timeout: Duration, worker: W) -> Result<Self>
    where
        W: FnOnce(mpsc::Receiver<Job>) + Send + 'static,
    {
        let (jobs, queue) = mpsc::channel();
        thread::Builder::new()
            .name(WORKER_NAME.into())
            .spawn(move || worker(queue))?;
        tracing::debug!("toolkit clipboard worker started");
        Ok(Self { jobs, timeout })
    }

    async fn submit<T>(
        &self,
        operation: &str,
        job: impl FnOnce(oneshot::Sender<Result<T>>) -> Job,
    ) -> Result<T> {
        let (reply, answer) = oneshot::channel();
        self.jobs.send(job(reply)).map_err(|_| worker_gone())?;

        match timeout(self.timeout, answer).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(worker_gone()),
            Err(_) => {
                tracing::warn!(operation, "toolkit clipboard call timed out");
                Err(Error::Timeout {
                    operation: format!("toolkit {operation}"),
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl ClipboardBackend for ToolkitBackend {
    fn name(&self) -> &str {
        BackendKind::ToolkitFallback.as_str()
    }

    async fn get(&self) -> Result<ClipboardContent> {
        let text = self.submit("read", Job::Read).await?;
        Ok(ClipboardContent::with_type(text, DEFAULT_CONTENT_TYPE))
    }

    async fn set(&self, content: &str, _content_type: &str) -> Result<()> {
        let content = content.to_string();
        self.submit("write", move |reply| Job::Write(content, reply))
            .await
    }
}

fn worker_gone() -> Error {
    Error::BackendExecution {
        helper: "toolkit".into(),
        stderr: "clipboard worker exited".into(),
    }
}

fn worker_loop(queue: mpsc::Receiver<Job>, mut session: ToolkitSession) {
    while let Ok(job) = queue.recv() {
        match job {
            Job::Read(reply) => {
                let _ = reply.send(session.read());
            }
            Job::Write(text, reply) => {
                let _ = reply.send(session.write(text));
            }
        }
    }
    tracing::debug!("toolkit clipboard worker stopped");
}

struct ToolkitSession {
    clipboard: Option<arboard::Clipboard>,
    display_available: fn() -> bool,
}

impl ToolkitSession {
    fn new(display_available: fn() -> bool) -> Self {
        Self {
            clipboard: None,
            display_available,
        }
    }

    /// Initialize once; later calls reuse the handle.
    fn ensure(&mut self) -> Result<&mut arboard::Clipboard> {
        let clipboard = match self.clipboard.take() {
            Some(clipboard) => clipboard,
            None => {
                if !(self.display_available)() {
                    return Err(Error::NoDisplay);
                }
                let clipboard = arboard::Clipboard::new().map_err(init_error)?;
                tracing::info!("toolkit clipboard initialized");
                clipboard
            }
        };
        Ok(self.clipboard.insert(clipboard))
    }

    fn read(&mut self) -> Result<String> {
        read_result(self.ensure()?.get_text())
    }

    fn write(&mut self, text: String) -> Result<()> {
        // The handle stays alive in this thread afterwards, so the selection
        // keeps being served once the request has returned.
        self.ensure()?.set_text(text).map_err(call_error)
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn display_available() -> bool {
    ["WAYLAND_DISPLAY", "DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn display_available() -> bool {
    true
}

/// An empty clipboard reads as empty text.
fn read_result(result: std::result::Result<String, arboard::Error>) -> Result<String> {
    match result {
        Ok(text) => Ok(text),
        Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
        Err(e) => Err(call_error(e)),
    }
}

fn init_error(e: arboard::Error) -> Error {
    match e {
        arboard::Error::ClipboardNotSupported => Error::NoDisplay,
        other => call_error(other),
    }
}

fn call_error(e: arboard::Error) -> Error {
    Error::BackendExecution {
        helper: "toolkit".into(),
        stderr: e.to_string(),
    }
}
