//! API layer for the Augment bridge.
//!
//! This module contains the HTTP handlers, the Augment request middleware,
//! request/response models and the streaming body plumbing.

pub mod augment;
pub mod handlers;
pub mod models;
pub mod streaming;

use crate::core::{request_id_middleware, MetricsMiddleware, MAX_REQUEST_BODY_BYTES};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types
pub use augment::{augment_chat_stream_middleware, into_ndjson_response, NDJSON_CONTENT_TYPE};
pub use handlers::{
    chat_completions, create_http_client, health, metrics_handler, AppJson, AppState,
};
pub use models::{AugmentChatStreamRequest, ChatCompletionRequest, HealthResponse};
pub use streaming::{transcode_response_body, transcode_stream, BodySink};

/// Build router with all endpoints.
pub fn app_router(state: Arc<AppState>) -> Router {
    // The Augment route runs the same relay, wrapped by the translation middleware
    let augment_routes = Router::new()
        .route("/chat-stream", post(chat_completions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            augment_chat_stream_middleware,
        ));

    Router::new()
        .merge(augment_routes)
        .route("/v1/chat/completions", post(chat_completions))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(middleware::from_fn(MetricsMiddleware::track_metrics))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
