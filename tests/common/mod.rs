//! Shared fakes and request helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use clipboard_bridge::backend::ClipboardBackend;
use clipboard_bridge::server::{router, AppState};
use clipboard_bridge::{ClipboardContent, ClipboardExecutor, Error, Result};

pub const API_KEY: &str = "test-key";

/// Clipboard that keeps whatever was last written, like a persisting
/// display server would.
pub struct MemoryBackend {
    current: Mutex<ClipboardContent>,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(ClipboardContent::text("")),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.gets.load(Ordering::SeqCst),
            self.sets.load(Ordering::SeqCst),
        )
    }

    pub fn current(&self) -> ClipboardContent {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ClipboardBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self) -> Result<ClipboardContent> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    async fn set(&self, content: &str, content_type: &str) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = ClipboardContent::with_type(content, content_type);
        Ok(())
    }
}

/// Backend whose helper always fails.
pub struct BrokenBackend;

#[async_trait::async_trait]
impl ClipboardBackend for BrokenBackend {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self) -> Result<ClipboardContent> {
        Err(Error::BackendExecution {
            helper: "wl-paste".into(),
            stderr: "No suitable type of content copied".into(),
        })
    }

    async fn set(&self, _content: &str, _content_type: &str) -> Result<()> {
        Err(Error::BackendExecution {
            helper: "wl-copy".into(),
            stderr: "Failed to connect to a Wayland server".into(),
        })
    }
}

pub fn app(backend: Arc<dyn ClipboardBackend>) -> Router {
    router(AppState::new(ClipboardExecutor::new(backend), API_KEY))
}

pub fn request(method: &str, uri: &str, key: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

pub fn is_rfc3339(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
        .unwrap_or(false)
}
