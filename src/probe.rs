//! Startup backend selection.
//!
//! Native helpers matching the detected display protocol win over the
//! in-process toolkit. Helper presence is a `PATH` lookup, never an
//! invocation. The result is computed once; a display-session change after
//! startup needs a restart.

use crate::backend::BackendKind;

/// Wayland session variable.
pub const WAYLAND_DISPLAY: &str = "WAYLAND_DISPLAY";
/// X11 session variable.
pub const X11_DISPLAY: &str = "DISPLAY";

/// What the probe can observe about the host.
pub trait Environment {
    /// Value of an environment variable.
    fn var(&self, key: &str) -> Option<String>;

    /// Whether `program` resolves on the executable search path.
    fn has_executable(&self, program: &str) -> bool;

    /// Whether the toolkit clipboard can be used in-process.
    fn toolkit_available(&self) -> bool;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn has_executable(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn toolkit_available(&self) -> bool {
        cfg!(feature = "toolkit")
    }
}

fn session_present(env: &impl Environment, key: &str) -> bool {
    env.var(key).is_some_and(|v| !v.is_empty())
}

/// Pick the backend for this process.
pub fn detect(env: &impl Environment) -> BackendKind {
    if session_present(env, WAYLAND_DISPLAY) && env.has_executable("wl-copy") {
        return BackendKind::Wayland;
    }

    if session_present(env, X11_DISPLAY) {
        if env.has_executable("xclip") {
            return BackendKind::X11Xclip;
        }
        if env.has_executable("xsel") {
            return BackendKind::X11Xsel;
        }
    }

    if env.toolkit_available() {
        return BackendKind::ToolkitFallback;
    }

    BackendKind::None
}
