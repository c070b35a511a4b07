//! HTTP request handlers for the Augment bridge.
//!
//! [`chat_completions`] is the backend relay: it forwards an OpenAI-format
//! request to the configured upstream and streams the upstream body back
//! untouched. On the `/chat-stream` route it runs behind the Augment
//! middleware, which rewrites the request before it gets here and transcodes
//! what it returns.

use crate::api::models::{ChatCompletionRequest, HealthResponse};
use crate::core::config::AppConfig;
use crate::core::logging::get_request_id;
use crate::core::{AppError, Result};
use anyhow::Context;
use axum::{
    body::Body,
    extract::{FromRequest, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use prometheus::{Encoder, TextEncoder};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let http_client = create_http_client(&config)?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

/// Create HTTP client with connection pooling.
pub fn create_http_client(config: &AppConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(!config.verify_ssl)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .context("Failed to build HTTP client")
}

/// JSON body extractor whose rejection is rendered as an [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Relay a chat completion request to the upstream backend.
#[tracing::instrument(
    skip(state, payload),
    fields(
        request_id = %get_request_id(),
        model = %payload.model,
        stream = payload.stream,
    )
)]
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ChatCompletionRequest>,
) -> Result<Response> {
    let url = state.config.upstream.chat_completions_url();

    let mut request = state
        .http_client
        .post(&url)
        .header("Content-Type", "application/json");
    if !state.config.upstream.api_key.is_empty() {
        request = request.bearer_auth(&state.config.upstream.api_key);
    }

    let response = request.json(&payload).send().await.map_err(|e| {
        tracing::error!(
            url = %url,
            error = %e,
            error_source = ?e.source(),
            is_timeout = e.is_timeout(),
            is_connect = e.is_connect(),
            "HTTP request failed to upstream"
        );
        AppError::from(e)
    })?;

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    tracing::debug!(url = %url, status = %status, "Upstream responded");

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        .unwrap_or_else(|| {
            HeaderValue::from_static(if payload.stream {
                "text/event-stream"
            } else {
                "application/json"
            })
        });

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(response.bytes_stream()))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Basic health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buffer))
        .map_err(|e| AppError::Internal(e.to_string()))
}
