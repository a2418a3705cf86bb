//! Start/stop control for a bridge child process plus a health probe.
//!
//! The supervisor owns at most one child. Externally there are only two
//! states: `start` while running and `stop` while stopped are no-ops.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::client::BridgeClient;
use crate::config::{API_KEY_VAR, DEFAULT_API_KEY, DEFAULT_HOST, DEFAULT_PORT, HOST_VAR, PORT_VAR};
use crate::error::{Error, Result};

/// Bridge executable spawned by default.
pub const DEFAULT_PROGRAM: &str = "clipboard-bridge";

/// How the child is launched and probed.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Bridge executable.
    pub program: PathBuf,
    /// Extra arguments.
    pub args: Vec<String>,
    /// Bind host; `None` keeps the parent's `CLIPBOARD_BRIDGE_HOST` or the default.
    pub host: Option<String>,
    /// Port handed to the child.
    pub port: u16,
    /// URL the health check targets; `None` means `http://127.0.0.1:<port>`.
    pub health_url: Option<String>,
    /// API key handed to the child.
    pub api_key: String,
    /// Time between SIGTERM and a forced kill.
    pub grace_period: Duration,
    /// Bound for the health probe.
    pub health_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            args: Vec::new(),
            host: None,
            port: DEFAULT_PORT,
            health_url: None,
            api_key: DEFAULT_API_KEY.into(),
            grace_period: Duration::from_secs(3),
            health_timeout: Duration::from_secs(3),
        }
    }
}

impl SupervisorConfig {
    /// Health-check a user-edited base URL as given; the child only gets its port.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.port = port_from_base_url(base_url);
        self.health_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    /// Address probed by [`Supervisor::test`].
    pub fn base_url(&self) -> String {
        match &self.health_url {
            Some(url) => url.clone(),
            None => format!("http://127.0.0.1:{}", self.port),
        }
    }
}

/// Last `:`-separated segment of a URL as a port, or the default port.
pub fn port_from_base_url(base_url: &str) -> u16 {
    base_url
        .trim_end_matches('/')
        .rsplit(':')
        .next()
        .and_then(|segment| segment.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No live child.
    Stopped,
    /// Child is alive.
    Running,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Stopped => f.write_str("stopped"),
            ServiceState::Running => f.write_str("running"),
        }
    }
}

/// Outcome of a health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthReport {
    /// Bridge answered; carries its backend name.
    Healthy(String),
    /// Connection refused or timed out.
    Unreachable(String),
    /// Anything else.
    Error(String),
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthReport::Healthy(backend) => write!(f, "healthy ({backend})"),
            HealthReport::Unreachable(cause) => write!(f, "unreachable: {cause}"),
            HealthReport::Error(cause) => write!(f, "error: {cause}"),
        }
    }
}

/// Owner of the bridge child process.
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    child: Option<Child>,
}

impl Supervisor {
    /// New supervisor in the stopped state.
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            child: None,
        }
    }

    /// Launch configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Current state; a child that exited on its own counts as stopped.
    pub fn state(&mut self) -> ServiceState {
        if self.is_alive() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        }
    }

    /// PID of the tracked child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn is_alive(&mut self) -> bool {
        matches!(
            self.child.as_mut().map(Child::try_wait),
            Some(Ok(None))
        )
    }

    /// Spawn the bridge unless it is already running.
    pub fn start(&mut self) -> Result<ServiceState> {
        if self.is_alive() {
            tracing::debug!(pid = ?self.pid(), "bridge already running");
            return Ok(ServiceState::Running);
        }

        let host = self
            .config
            .host
            .clone()
            .or_else(|| std::env::var(HOST_VAR).ok())
            .unwrap_or_else(|| DEFAULT_HOST.into());

        let child = Command::new(&self.config.program)
            .args(&self.config.args)
            .env(HOST_VAR, host)
            .env(PORT_VAR, self.config.port.to_string())
            .env(API_KEY_VAR, &self.config.api_key)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        tracing::info!(
            pid = ?child.id(),
            program = %self.config.program.display(),
            port = self.config.port,
            "bridge started"
        );
        self.child = Some(child);
        Ok(ServiceState::Running)
    }

    /// Terminate the bridge: SIGTERM, wait for the grace period, then kill.
    /// Always ends in [`ServiceState::Stopped`].
    pub async fn stop(&mut self) -> ServiceState {
        let Some(mut child) = self.child.take() else {
            return ServiceState::Stopped;
        };

        if let Ok(None) = child.try_wait() {
            let pid = child.id();
            if !request_terminate(&mut child) {
                tracing::debug!(?pid, "could not deliver SIGTERM");
            }

            match tokio::time::timeout(self.config.grace_period, child.wait()).await {
                Ok(Ok(status)) => tracing::info!(?pid, %status, "bridge stopped"),
                Ok(Err(e)) => tracing::warn!(?pid, "waiting for bridge failed: {}", e),
                Err(_) => {
                    tracing::warn!(?pid, "bridge ignored SIGTERM, killing");
                    if let Err(e) = child.kill().await {
                        tracing::warn!(?pid, "kill failed: {}", e);
                    }
                }
            }
        }

        ServiceState::Stopped
    }

    /// Probe `/health` on a spawned task; the caller is never blocked.
    pub fn test(&self) -> JoinHandle<HealthReport> {
        let base_url = self.config.base_url();
        let timeout = self.config.health_timeout;
        tokio::spawn(async move { check_health(&base_url, timeout).await })
    }

    /// Stop the child and consume the supervisor.
    pub async fn shutdown(mut self) {
        self.stop().await;
    }
}

/// One health probe against `base_url`.
pub async fn check_health(base_url: &str, timeout: Duration) -> HealthReport {
    let client = match BridgeClient::with_timeout(base_url, "", timeout) {
        Ok(client) => client,
        Err(e) => return HealthReport::Error(e.to_string()),
    };

    match client.health().await {
        Ok(health) => HealthReport::Healthy(health.backend),
        Err(Error::Http(e)) if e.is_connect() || e.is_timeout() => {
            HealthReport::Unreachable(e.to_string())
        }
        Err(e) => HealthReport::Error(e.to_string()),
    }
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) -> bool {
    match child.id() {
        // SAFETY: kill(2) on a child we spawned and have not reaped yet.
        Some(pid) => unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 },
        None => false,
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) -> bool {
    child.start_kill().is_ok()
}
