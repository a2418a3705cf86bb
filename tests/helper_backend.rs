//! Helper-process backend tests.
//!
//! Real child processes stand in for wl-paste/wl-copy: `sh -c` scripts that
//! print, fail, hang or capture stdin.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clipboard_bridge::backend::{ClipboardBackend, HelperBackend, HelperCommand, STDERR_LIMIT};
use clipboard_bridge::{ClipboardExecutor, Error};

fn sh(script: &str) -> HelperCommand {
    HelperCommand::new("sh", ["-c", script])
}

fn backend(read: &str, write: &str, timeout: Duration) -> HelperBackend {
    HelperBackend::new("fake", sh(read), sh(write), timeout)
}

fn scratch_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "clipboard-bridge-{}-{}",
        std::process::id(),
        name
    ));
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn standard_helpers_use_expected_arguments() {
    let timeout = Duration::from_secs(5);

    let wayland = HelperBackend::wayland(timeout);
    assert_eq!(wayland.read_command(), &HelperCommand::new("wl-paste", ["--no-newline"]));
    assert_eq!(wayland.write_command().program, "wl-copy");
    assert!(wayland.write_command().args.is_empty());

    let xclip = HelperBackend::xclip(timeout);
    assert_eq!(
        xclip.read_command(),
        &HelperCommand::new("xclip", ["-selection", "clipboard", "-o"])
    );
    assert_eq!(
        xclip.write_command(),
        &HelperCommand::new("xclip", ["-selection", "clipboard"])
    );

    let xsel = HelperBackend::xsel(timeout);
    assert_eq!(
        xsel.read_command(),
        &HelperCommand::new("xsel", ["--clipboard", "--output"])
    );
    assert_eq!(
        xsel.write_command(),
        &HelperCommand::new("xsel", ["--clipboard", "--input"])
    );
}

#[tokio::test]
async fn read_captures_stdout_verbatim() {
    let backend = backend("printf 'line one\\nline two'", "cat >/dev/null", Duration::from_secs(5));
    let content = backend.get().await.unwrap();
    assert_eq!(content.content, "line one\nline two");
    assert_eq!(content.content_type, "text/plain");
}

#[tokio::test]
async fn read_replaces_invalid_utf8() {
    let backend = backend("printf 'ok\\377'", "cat >/dev/null", Duration::from_secs(5));
    let content = backend.get().await.unwrap();
    assert_eq!(content.content, "ok\u{FFFD}");
}

#[tokio::test]
async fn read_failure_carries_stderr() {
    let backend = backend(
        "echo 'Nothing is copied' >&2; exit 1",
        "cat >/dev/null",
        Duration::from_secs(5),
    );
    match backend.get().await {
        Err(Error::BackendExecution { helper, stderr }) => {
            assert_eq!(helper, "sh");
            assert_eq!(stderr, "Nothing is copied");
        }
        other => panic!("expected BackendExecution, got {other:?}"),
    }
}

#[tokio::test]
async fn write_streams_content_to_stdin() {
    let target = scratch_file("write");
    let script = format!("cat > '{}'", target.display());
    let backend = backend("true", &script, Duration::from_secs(5));

    backend.set("héllo\nworld", "text/plain").await.unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "héllo\nworld");

    backend.set("", "text/plain").await.unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "");

    let _ = std::fs::remove_file(&target);
}

#[tokio::test]
async fn write_failure_carries_stderr() {
    let backend = backend(
        "true",
        "cat >/dev/null; echo 'cannot open display' >&2; exit 3",
        Duration::from_secs(5),
    );
    let err = backend.set("x", "text/plain").await.unwrap_err();
    assert_eq!(err.to_string(), "sh failed: cannot open display");
}

#[tokio::test]
async fn write_failure_without_stderr_reports_exit_status() {
    let backend = backend("true", "exit 4", Duration::from_secs(5));
    let err = backend.set("ignored", "text/plain").await.unwrap_err();
    match err {
        Error::BackendExecution { stderr, .. } => assert!(stderr.contains('4'), "{stderr}"),
        other => panic!("expected BackendExecution, got {other:?}"),
    }
}

#[tokio::test]
async fn write_failure_with_large_stderr_is_not_a_timeout() {
    // Far more than a pipe buffer on stderr before failing.
    let backend = backend(
        "true",
        "cat >/dev/null; head -c 200000 /dev/zero | tr '\\0' e >&2; exit 1",
        Duration::from_secs(5),
    );
    let started = Instant::now();
    match backend.set("x", "text/plain").await {
        Err(Error::BackendExecution { helper, stderr }) => {
            assert_eq!(helper, "sh");
            assert_eq!(stderr.len(), STDERR_LIMIT);
            assert!(stderr.bytes().all(|b| b == b'e'));
        }
        other => panic!("expected BackendExecution, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn write_does_not_wait_for_forked_server() {
    // Like wl-copy: the foreground process exits while a background copy
    // keeps running with the inherited stderr.
    let backend = backend(
        "true",
        "cat >/dev/null; (sleep 30 &) ; exit 0",
        Duration::from_secs(5),
    );
    let started = Instant::now();
    backend.set("served", "text/plain").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn hung_read_helper_is_killed_after_timeout() {
    let backend = backend("exec sleep 30", "cat >/dev/null", Duration::from_millis(200));

    let started = Instant::now();
    let err = backend.get().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(err.is_timeout(), "{err:?}");
    assert!(err.to_string().contains("timed out after 200ms"));
}

#[tokio::test]
async fn hung_write_helper_is_killed_after_timeout() {
    let backend = backend("true", "exec sleep 30", Duration::from_millis(200));

    let started = Instant::now();
    let err = backend.set("x", "text/plain").await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err, Error::Timeout { .. }), "{err:?}");
}

#[tokio::test]
async fn missing_helper_is_an_execution_error() {
    let backend = HelperBackend::new(
        "fake",
        HelperCommand::new("clipboard-bridge-no-such-helper", Vec::<String>::new()),
        HelperCommand::new("clipboard-bridge-no-such-helper", Vec::<String>::new()),
        Duration::from_secs(1),
    );
    let err = backend.get().await.unwrap_err();
    assert!(matches!(err, Error::BackendExecution { .. }), "{err:?}");
    assert!(err.to_string().contains("could not start"));
}

#[tokio::test]
async fn executor_flattens_and_keeps_timeout_class() {
    let executor = ClipboardExecutor::new(std::sync::Arc::new(backend(
        "exec sleep 30",
        "exit 2",
        Duration::from_millis(200),
    )));

    let err = executor.get().await.unwrap_err();
    assert!(matches!(err, Error::ClipboardOperation { .. }));
    assert!(err.is_timeout());

    let err = executor.clear().await.unwrap_err();
    assert!(matches!(err, Error::ClipboardOperation { .. }));
    assert!(!err.is_timeout());
    assert_eq!(executor.backend_name(), "fake");
}
