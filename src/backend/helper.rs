//! Backends that shell out to a short-lived helper per operation.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, Command};
use tokio::time::timeout;

use super::{BackendKind, ClipboardBackend};
use crate::error::{Error, Result};
use crate::protocol::{ClipboardContent, DEFAULT_CONTENT_TYPE};

/// Most stderr kept from a failed write helper.
pub const STDERR_LIMIT: usize = 64 * 1024;

/// Program plus fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    /// Executable name or path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl HelperCommand {
    /// Build a command from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        cmd
    }
}

/// Clipboard access through a read helper and a write helper.
#[derive(Debug, Clone)]
pub struct HelperBackend {
    name: String,
    read: HelperCommand,
    write: HelperCommand,
    timeout: Duration,
}

impl HelperBackend {
    /// Arbitrary read/write helper pair.
    pub fn new(
        name: impl Into<String>,
        read: HelperCommand,
        write: HelperCommand,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            read,
            write,
            timeout,
        }
    }

    /// `wl-paste --no-newline` / `wl-copy`.
    pub fn wayland(timeout: Duration) -> Self {
        Self::new(
            BackendKind::Wayland.as_str(),
            HelperCommand::new("wl-paste", ["--no-newline"]),
            HelperCommand::new("wl-copy", Vec::<String>::new()),
            timeout,
        )
    }

    /// `xclip` on the clipboard selection.
    pub fn xclip(timeout: Duration) -> Self {
        Self::new(
            BackendKind::X11Xclip.as_str(),
            HelperCommand::new("xclip", ["-selection", "clipboard", "-o"]),
            HelperCommand::new("xclip", ["-selection", "clipboard"]),
            timeout,
        )
    }

    /// `xsel` on the clipboard selection.
    pub fn xsel(timeout: Duration) -> Self {
        Self::new(
            BackendKind::X11Xsel.as_str(),
            HelperCommand::new("xsel", ["--clipboard", "--output"]),
            HelperCommand::new("xsel", ["--clipboard", "--input"]),
            timeout,
        )
    }

    /// Read helper.
    pub fn read_command(&self) -> &HelperCommand {
        &self.read
    }

    /// Write helper.
    pub fn write_command(&self) -> &HelperCommand {
        &self.write
    }

    async fn run_read(&self) -> Result<Vec<u8>> {
        let child = self
            .read
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.read.program, e))?;

        tracing::debug!(helper = %self.read.program, pid = ?child.id(), "read helper spawned");

        // On timeout the future, and with it the child, is dropped; kill_on_drop
        // delivers SIGKILL.
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| self.timed_out(&self.read))??;

        if !output.status.success() {
            return Err(Error::BackendExecution {
                helper: self.read.program.clone(),
                stderr: stderr_text(&output.stderr, output.status),
            });
        }

        Ok(output.stdout)
    }

    async fn run_write(&self, input: &[u8]) -> Result<()> {
        // Writers fork a background process that keeps serving the selection
        // and inherits our pipes. stdout is discarded and stderr is only
        // reported after a failed exit, when no background copy exists.
        let mut child = self
            .write
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.write.program, e))?;

        tracing::debug!(helper = %self.write.program, pid = ?child.id(), bytes = input.len(), "write helper spawned");

        match timeout(self.timeout, feed_and_wait(&mut child, input)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.with_helper(&self.write.program)),
            Err(_) => {
                let _ = child.kill().await;
                Err(self.timed_out(&self.write))
            }
        }
    }

    fn timed_out(&self, helper: &HelperCommand) -> Error {
        tracing::warn!(helper = %helper.program, timeout_ms = self.timeout.as_millis() as u64, "helper timed out, killed");
        Error::Timeout {
            operation: helper.program.clone(),
            after: self.timeout,
        }
    }
}

#[async_trait::async_trait]
impl ClipboardBackend for HelperBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self) -> Result<ClipboardContent> {
        let stdout = self.run_read().await?;
        Ok(ClipboardContent::with_type(
            String::from_utf8_lossy(&stdout).into_owned(),
            DEFAULT_CONTENT_TYPE,
        ))
    }

    async fn set(&self, content: &str, _content_type: &str) -> Result<()> {
        self.run_write(content.as_bytes()).await
    }
}

/// Failure of a write helper before its name is attached.
enum WriteFailure {
    Io(std::io::Error),
    Exit(String),
}

impl WriteFailure {
    fn with_helper(self, helper: &str) -> Error {
        match self {
            WriteFailure::Io(e) => Error::Io(e),
            WriteFailure::Exit(stderr) => Error::BackendExecution {
                helper: helper.to_string(),
                stderr,
            },
        }
    }
}

async fn feed_and_wait(child: &mut Child, input: &[u8]) -> std::result::Result<(), WriteFailure> {
    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(input).await {
            Ok(()) => {}
            // Helper exited without reading; its exit status tells the story.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Err(e) => return Err(WriteFailure::Io(e)),
        }
        let _ = stdin.shutdown().await;
    }

    // stderr is drained alongside the wait so a chatty helper cannot block on
    // a full pipe. On success the buffer is dropped without waiting for EOF.
    let mut pipe = child.stderr.take();
    let mut captured = Vec::new();
    let status = {
        let drain = collect_stderr(pipe.as_mut(), &mut captured);
        tokio::pin!(drain);
        let (status, drained) = tokio::select! {
            status = child.wait() => (status, false),
            () = &mut drain => (child.wait().await, true),
        };
        let status = status.map_err(WriteFailure::Io)?;
        if status.success() {
            return Ok(());
        }
        if !drained {
            drain.await;
        }
        status
    };
    Err(WriteFailure::Exit(stderr_text(&captured, status)))
}

/// Read `pipe` to EOF, keeping at most [`STDERR_LIMIT`] bytes.
async fn collect_stderr(pipe: Option<&mut ChildStderr>, into: &mut Vec<u8>) {
    let Some(pipe) = pipe else {
        return;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = STDERR_LIMIT.saturating_sub(into.len());
                into.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
}

fn stderr_text(stderr: &[u8], status: std::process::ExitStatus) -> String {
    let text = String::from_utf8_lossy(stderr).trim().to_string();
    if text.is_empty() {
        format!("exited with {status}")
    } else {
        text
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> Error {
    Error::BackendExecution {
        helper: program.to_string(),
        stderr: format!("could not start: {e}"),
    }
}
