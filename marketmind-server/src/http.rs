//! MarketMind HTTP API
//!
//! Axum-based HTTP server exposing the content repository plus the generation
//! and generator-backend proxy endpoints.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum
//! dispatch machinery.
//!
//! Endpoints:
//! - GET  /health     : health check with content directory
//! - GET  /version    : server version info
//! - GET  /load       : load one record (`contentId`, `contentType` query)
//! - POST /save       : store one record
//! - POST /clear      : delete every record
//! - GET  /list       : list records, optionally by `contentType`
//! - POST /generate   : run a generation session against the backend
//! - POST /chat       : persona chat (proxied)
//! - POST /group-chat : group chat across personas (proxied)
//! - POST /heatmap    : image heatmap analysis (proxied)

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use marketmind_core::models::{ChatMessage, HeatmapRequest, ProductInfo};
use marketmind_core::protocol::{ContentRequest, ContentResponse};
use marketmind_core::{ContentId, ContentRepository, GeneratorClient, MarketMindConfig};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::subsystems::generate::{run_generation, GenerationError, GenerationRequest};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub repository: ContentRepository,
    pub generator: GeneratorClient,
    pub config: MarketMindConfig,
}

impl HttpState {
    pub fn from_config(config: MarketMindConfig) -> Result<Self> {
        Ok(Self {
            repository: ContentRepository::from_config(&config.storage),
            generator: GeneratorClient::new(&config.generator)?,
            config,
        })
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/load", get(load_handler))
        .route("/save", post(save_handler))
        .route("/clear", post(clear_handler))
        .route("/list", get(list_handler))
        .route("/generate", post(generate_handler))
        .route("/chat", post(chat_handler))
        .route("/group-chat", post(group_chat_handler))
        .route("/heatmap", post(heatmap_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    config: MarketMindConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = config.http_addr();
    let state = Arc::new(HttpState::from_config(config)?);
    tracing::info!(content_dir = %state.repository.location(), "Content repository ready");

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("MarketMind HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoadParams {
    pub content_id: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub content_id: Option<String>,
    pub content_type: Option<String>,
    pub content: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub product_info: Option<String>,
    pub company_info: Option<String>,
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatProxyRequest {
    pub content_id: Option<String>,
    pub persona_name: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupChatProxyRequest {
    pub content_id: Option<String>,
    pub initial_message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapProxyRequest {
    /// Image bytes, base64 encoded.
    pub image: Option<String>,
    pub mime_type: Option<String>,
    pub persona: Option<String>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }

    fn body(msg: impl Into<String>) -> serde_json::Value {
        serde_json::to_value(Self::new(msg)).unwrap_or_default()
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check: reports the content directory (no IO).
pub fn health_inner(repository: &ContentRepository) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "content_dir": repository.location(),
        }),
    )
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "marketmind/1",
    })
}

/// Inner load: returns the stored JSON payload itself on success.
pub async fn load_inner(
    repository: &ContentRepository,
    params: LoadParams,
) -> (StatusCode, serde_json::Value) {
    let request = ContentRequest::Load {
        content_id: params.content_id,
        content_type: params.content_type,
    };
    let response = crate::router::handle_request(request, repository).await;
    response_to_http(response, "Failed to load content")
}

/// Inner save: stores `content` under `{contentType}-{contentId}`.
pub async fn save_inner(
    repository: &ContentRepository,
    req: SaveRequest,
) -> (StatusCode, serde_json::Value) {
    let request = ContentRequest::Save {
        content_id: req.content_id,
        content_type: req.content_type,
        content: req.content,
    };
    let response = crate::router::handle_request(request, repository).await;
    response_to_http(response, "Failed to save content")
}

/// Inner clear: 200 whether or not anything existed.
pub async fn clear_inner(repository: &ContentRepository) -> (StatusCode, serde_json::Value) {
    let response = crate::router::handle_request(ContentRequest::Clear, repository).await;
    response_to_http(response, "Failed to clear content")
}

/// Inner list: records in the store, optionally of one type.
pub async fn list_inner(
    repository: &ContentRepository,
    params: ListParams,
) -> (StatusCode, serde_json::Value) {
    let request = ContentRequest::List {
        content_type: params.content_type,
    };
    let response = crate::router::handle_request(request, repository).await;
    response_to_http(response, "Failed to list content")
}

/// Inner generate: runs a full generation session and reports what was stored.
pub async fn generate_inner(
    repository: &ContentRepository,
    generator: &GeneratorClient,
    req: GenerateRequest,
) -> (StatusCode, serde_json::Value) {
    let product_info = match req.product_info {
        Some(p) if !p.trim().is_empty() => p,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                ErrorResponse::body("productInfo is required"),
            )
        }
    };

    let start = Instant::now();
    let request = GenerationRequest {
        product: ProductInfo::new(product_info, req.company_info),
        reset: req.reset,
    };

    match run_generation(repository, generator, request).await {
        Ok(report) => {
            let mut body = serde_json::to_value(&report).unwrap_or_default();
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "tookMs".to_string(),
                    serde_json::json!(start.elapsed().as_millis() as u64),
                );
            }
            (StatusCode::OK, body)
        }
        Err(e @ GenerationError::Backend(_)) => {
            tracing::error!(error = %e, "Generation failed");
            (StatusCode::BAD_GATEWAY, ErrorResponse::body("Failed to generate content"))
        }
        Err(e) => {
            tracing::error!(error = %e, "Generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::body("Failed to generate content"),
            )
        }
    }
}

/// Inner chat: forwards one persona conversation to the backend.
pub async fn chat_inner(
    generator: &GeneratorClient,
    req: ChatProxyRequest,
) -> (StatusCode, serde_json::Value) {
    let (content_id, persona_name) = match (parse_id(req.content_id), req.persona_name) {
        (Some(id), Some(name)) if !name.trim().is_empty() => (id, name),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                ErrorResponse::body("contentId and personaName are required"),
            )
        }
    };

    match generator.chat(&content_id, &persona_name, req.messages).await {
        Ok(response) => (StatusCode::OK, serde_json::json!({ "response": response })),
        Err(e) => {
            tracing::error!(error = %e, persona = %persona_name, "Error chatting with persona");
            (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::body("Failed to process chat request"),
            )
        }
    }
}

/// Inner group chat: one message answered by every persona of the session.
pub async fn group_chat_inner(
    generator: &GeneratorClient,
    req: GroupChatProxyRequest,
) -> (StatusCode, serde_json::Value) {
    let (content_id, message) = match (parse_id(req.content_id), req.initial_message) {
        (Some(id), Some(msg)) if !msg.trim().is_empty() => (id, msg),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                ErrorResponse::body("contentId and initialMessage are required"),
            )
        }
    };

    match generator.group_chat(&content_id, &message).await {
        Ok(result) => (
            StatusCode::OK,
            serde_json::to_value(result).unwrap_or_default(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Error in group chat");
            (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::body("Failed to process group chat request"),
            )
        }
    }
}

/// Inner heatmap: wraps the image as a data URL for the backend.
pub async fn heatmap_inner(
    generator: &GeneratorClient,
    req: HeatmapProxyRequest,
) -> (StatusCode, serde_json::Value) {
    let (image, persona) = match (req.image, req.persona) {
        (Some(img), Some(p)) if !img.is_empty() && !p.trim().is_empty() => (img, p),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                ErrorResponse::body("Image and persona are required"),
            )
        }
    };
    let mime_type = req.mime_type.unwrap_or_else(|| "image/png".to_string());
    let request = HeatmapRequest::for_persona(&mime_type, &image, &persona);

    match generator.heatmap(&request).await {
        Ok(data) => (StatusCode::OK, data),
        Err(e) => {
            tracing::error!(error = %e, "Error processing heatmap request");
            (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::body("Failed to process heatmap analysis"),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.repository);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn load_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<LoadParams>,
) -> impl IntoResponse {
    let (status, body) = load_inner(&state.repository, params).await;
    (status, Json(body))
}

pub async fn save_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<SaveRequest>,
) -> impl IntoResponse {
    let (status, body) = save_inner(&state.repository, req).await;
    (status, Json(body))
}

pub async fn clear_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = clear_inner(&state.repository).await;
    (status, Json(body))
}

pub async fn list_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let (status, body) = list_inner(&state.repository, params).await;
    (status, Json(body))
}

pub async fn generate_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<GenerateRequest>,
) -> impl IntoResponse {
    let (status, body) = generate_inner(&state.repository, &state.generator, req).await;
    (status, Json(body))
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ChatProxyRequest>,
) -> impl IntoResponse {
    let (status, body) = chat_inner(&state.generator, req).await;
    (status, Json(body))
}

pub async fn group_chat_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<GroupChatProxyRequest>,
) -> impl IntoResponse {
    let (status, body) = group_chat_inner(&state.generator, req).await;
    (status, Json(body))
}

pub async fn heatmap_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<HeatmapProxyRequest>,
) -> impl IntoResponse {
    let (status, body) = heatmap_inner(&state.generator, req).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert a repository `ContentResponse` into an HTTP status and body.
///
/// Parameter errors surface their message with 400. Every other failure is
/// logged by the router and reported with the uniform `failure` message, so
/// not-found, corrupt and I/O errors look the same to the caller.
pub fn response_to_http(
    response: ContentResponse,
    failure: &str,
) -> (StatusCode, serde_json::Value) {
    if response.is_ok() {
        return (
            StatusCode::OK,
            response.data.unwrap_or(serde_json::json!({})),
        );
    }

    match response.kind {
        Some(kind) if kind.is_client_error() => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::body(
                response
                    .error
                    .unwrap_or_else(|| "contentId and contentType are required".to_string()),
            ),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::body(failure)),
    }
}

fn parse_id(raw: Option<String>) -> Option<ContentId> {
    raw.and_then(|s| ContentId::new(s).ok())
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
