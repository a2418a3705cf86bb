//! # clipboard-bridge
//!
//! Local HTTP service exposing a VM's system clipboard to a host-side MCP
//! server.
//!
//! One clipboard backend is selected at startup and used for the life of the
//! process:
//!
//! - **Wayland**: `wl-paste` / `wl-copy`
//! - **X11**: `xclip`, or `xsel` when `xclip` is missing
//! - **Toolkit**: in-process `arboard` clipboard on a dedicated worker thread
//!   (cargo feature `toolkit`, on by default)
//!
//! ## REST API
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/` | no |
//! | GET | `/health` | no |
//! | GET | `/docs`, `/redoc`, `/openapi.json` | no |
//! | GET / POST / DELETE | `/clipboard` | `X-API-Key` header or `?api_key=` |
//!
//! ## Configuration
//!
//! `CLIPBOARD_BRIDGE_HOST` (default `0.0.0.0`), `CLIPBOARD_BRIDGE_PORT`
//! (default `8765`), `CLIPBOARD_BRIDGE_API_KEY` and
//! `CLIPBOARD_BRIDGE_TIMEOUT_MS` (default `5000`), read once at startup.
//!
//! ## Example
//!
//! ```no_run
//! use clipboard_bridge::{backend, probe, BridgeServer, ClipboardExecutor, ServiceConfig};
//!
//! # async fn run() -> clipboard_bridge::Result<()> {
//! let config = ServiceConfig::from_env()?;
//! let kind = probe::detect(&probe::SystemEnvironment);
//! let clipboard = ClipboardExecutor::new(backend::build(kind, config.helper_timeout)?);
//! BridgeServer::new(config, clipboard).run().await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod probe;
pub mod protocol;
pub mod server;
pub mod supervisor;

pub use backend::{BackendKind, ClipboardBackend};
pub use client::BridgeClient;
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use executor::ClipboardExecutor;
pub use protocol::{ClipboardContent, ClipboardResponse};
pub use server::BridgeServer;
pub use supervisor::{HealthReport, ServiceState, Supervisor, SupervisorConfig};
