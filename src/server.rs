//! HTTP service layer.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::executor::ClipboardExecutor;
use crate::protocol::{
    AuthError, ClipboardContent, ClipboardResponse, ErrorDetail, HealthStatus, ServiceInfo,
};

/// Service name.
pub const SERVICE_NAME: &str = "Overlay Companion MCP - Clipboard Bridge";

/// Service version.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Routes reachable without an API key.
pub const PUBLIC_PATHS: &[&str] = &["/", "/health", "/docs", "/redoc", "/openapi.json"];

/// Shared handler state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    clipboard: ClipboardExecutor,
    api_key: Arc<str>,
}

impl AppState {
    /// Build handler state.
    pub fn new(clipboard: ClipboardExecutor, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            clipboard,
            api_key: api_key.into(),
        }
    }
}

/// Clipboard bridge HTTP server.
pub struct BridgeServer {
    config: ServiceConfig,
    state: AppState,
}

impl BridgeServer {
    /// Create a server for the given configuration and executor.
    pub fn new(config: ServiceConfig, clipboard: ClipboardExecutor) -> Self {
        let state = AppState::new(clipboard, config.api_key.as_str());
        Self { config, state }
    }

    /// Router with authentication, CORS and tracing applied.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| Error::Bind { addr, source })
    }

    /// Bind and serve until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            %addr,
            backend = self.state.clipboard.backend_name(),
            "Starting clipboard bridge"
        );
        if self.config.uses_default_api_key() {
            tracing::warn!("using the default API key; set CLIPBOARD_BRIDGE_API_KEY");
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Clipboard bridge stopped");
        Ok(())
    }
}

/// Build the bridge router around the given state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/docs", get(docs))
        .route("/redoc", get(redoc))
        .route("/openapi.json", get(openapi))
        .route(
            "/clipboard",
            get(get_clipboard).post(set_clipboard).delete(clear_clipboard),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Whether `path` skips authentication.
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

#[derive(Debug, Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| {
            Query::<ApiKeyQuery>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(q)| q.api_key)
        });

    if provided.as_deref() != Some(&*state.api_key) {
        tracing::warn!(
            method = %request.method(),
            path = request.uri().path(),
            "rejected request without a valid API key"
        );
        let err = Error::Authentication;
        return (
            err.status_code(),
            Json(AuthError {
                error: err.to_string(),
            }),
        )
            .into_response();
    }

    next.run(request).await
}

/// Failed operation as returned to the caller.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn operation(label: &str, err: Error) -> Self {
        Self {
            status: err.status_code(),
            detail: format!("{label}: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorDetail {
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let endpoints: BTreeMap<String, String> = [
        ("health", "/health"),
        ("get_clipboard", "/clipboard"),
        ("set_clipboard", "/clipboard (POST)"),
        ("clear_clipboard", "/clipboard (DELETE)"),
        ("docs", "/docs"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Json(ServiceInfo {
        service: SERVICE_NAME.into(),
        version: SERVICE_VERSION.into(),
        status: "running".into(),
        backend: state.clipboard.backend_name().to_string(),
        endpoints,
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::healthy(state.clipboard.backend_name()))
}

async fn get_clipboard(
    State(state): State<AppState>,
) -> std::result::Result<Json<ClipboardResponse>, ApiError> {
    let content = state
        .clipboard
        .get()
        .await
        .map_err(|e| ApiError::operation("Failed to get clipboard content", e))?;
    tracing::info!(bytes = content.content.len(), "clipboard read");
    Ok(Json(ClipboardResponse::retrieved(content)))
}

async fn set_clipboard(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ClipboardContent>, JsonRejection>,
) -> std::result::Result<Json<ClipboardResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| ApiError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        detail: rejection.body_text(),
    })?;

    state
        .clipboard
        .set(&payload.content, &payload.content_type)
        .await
        .map_err(|e| ApiError::operation("Failed to set clipboard content", e))?;
    tracing::info!(bytes = payload.content.len(), "clipboard written");
    Ok(Json(ClipboardResponse::done("Clipboard content set successfully")))
}

async fn clear_clipboard(
    State(state): State<AppState>,
) -> std::result::Result<Json<ClipboardResponse>, ApiError> {
    state
        .clipboard
        .clear()
        .await
        .map_err(|e| ApiError::operation("Failed to clear clipboard", e))?;
    tracing::info!("clipboard cleared");
    Ok(Json(ClipboardResponse::done("Clipboard cleared successfully")))
}

async fn openapi() -> Json<serde_json::Value> {
    Json(openapi_document())
}

async fn docs() -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html>
<head>
<title>{SERVICE_NAME} - Swagger UI</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>SwaggerUIBundle({{ url: "/openapi.json", dom_id: "#swagger-ui" }});</script>
</body>
</html>"##
    ))
}

async fn redoc() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{SERVICE_NAME} - ReDoc</title></head>
<body>
<redoc spec-url="/openapi.json"></redoc>
<script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>"#
    ))
}

/// OpenAPI 3 description of the REST surface.
pub fn openapi_document() -> serde_json::Value {
    let clipboard_response = serde_json::json!({
        "description": "Operation result",
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ClipboardResponse"}}}
    });
    let failure = serde_json::json!({
        "description": "Backend failure",
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorDetail"}}}
    });
    let unauthorized = serde_json::json!({ "description": "Invalid or missing API key" });

    serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": SERVICE_NAME,
            "description": "VM clipboard access API for host MCP server integration",
            "version": SERVICE_VERSION,
        },
        "paths": {
            "/": {"get": {"summary": "Service information", "responses": {"200": {"description": "Service metadata"}}}},
            "/health": {"get": {"summary": "Health check", "responses": {"200": {"description": "Service is healthy"}}}},
            "/clipboard": {
                "get": {
                    "summary": "Get current clipboard content",
                    "security": [{"ApiKeyHeader": []}, {"ApiKeyQuery": []}],
                    "responses": {"200": clipboard_response, "401": unauthorized, "500": failure},
                },
                "post": {
                    "summary": "Set clipboard content",
                    "security": [{"ApiKeyHeader": []}, {"ApiKeyQuery": []}],
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ClipboardContent"}}}
                    },
                    "responses": {"200": clipboard_response, "401": unauthorized, "500": failure},
                },
                "delete": {
                    "summary": "Clear clipboard content",
                    "security": [{"ApiKeyHeader": []}, {"ApiKeyQuery": []}],
                    "responses": {"200": clipboard_response, "401": unauthorized, "500": failure},
                },
            },
        },
        "components": {
            "securitySchemes": {
                "ApiKeyHeader": {"type": "apiKey", "in": "header", "name": API_KEY_HEADER},
                "ApiKeyQuery": {"type": "apiKey", "in": "query", "name": "api_key"},
            },
            "schemas": {
                "ClipboardContent": {
                    "type": "object",
                    "required": ["content"],
                    "properties": {
                        "content": {"type": "string"},
                        "content_type": {"type": "string", "default": "text/plain"},
                    },
                },
                "ClipboardResponse": {
                    "type": "object",
                    "required": ["success", "timestamp"],
                    "properties": {
                        "success": {"type": "boolean"},
                        "content": {"type": "string"},
                        "content_type": {"type": "string"},
                        "timestamp": {"type": "string", "format": "date-time"},
                        "message": {"type": "string"},
                    },
                },
                "ErrorDetail": {
                    "type": "object",
                    "properties": {"detail": {"type": "string"}},
                },
            },
        },
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
