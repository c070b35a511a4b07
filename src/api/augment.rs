//! Augment `chat-stream` middleware.
//!
//! Wraps the backend relay: the plugin request body is decoded and replaced
//! by the canonical chat-completion request before the relay runs, and a
//! successful relay response is transcoded from SSE to NDJSON on its way out.

use crate::api::handlers::AppState;
use crate::api::models::AugmentChatStreamRequest;
use crate::api::streaming::transcode_response_body;
use crate::core::{AppError, Result, MAX_REQUEST_BODY_BYTES};
use crate::transformer::translate_request;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use futures::StreamExt;
use std::sync::Arc;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Translate the plugin request, run the relay, transcode its response.
pub async fn augment_chat_stream_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request.uri().path().to_string();

    let request = match rewrite_request(&state, request).await {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    let response = next.run(request).await;
    into_ndjson_response(response, endpoint)
}

/// Replace the plugin body with the serialized canonical request.
async fn rewrite_request(state: &AppState, request: Request) -> Result<Request> {
    let (mut parts, body) = request.into_parts();

    let bytes = read_body(body, MAX_REQUEST_BODY_BYTES).await?;
    let augment_request: AugmentChatStreamRequest = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let canonical = translate_request(&augment_request, &state.config.default_model);
    let body = serde_json::to_vec(&canonical).map_err(AppError::Marshal)?;

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

    Ok(Request::from_parts(parts, Body::from(body)))
}

/// Collect a request body, refusing to buffer more than `limit` bytes.
async fn read_body(body: Body, limit: usize) -> Result<Bytes> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

/// Swap a successful relay body for its NDJSON transcoding.
///
/// Error responses are returned untouched so the client sees the backend's
/// own error body.
pub fn into_ndjson_response(response: Response, endpoint: String) -> Response {
    if !response.status().is_success() {
        tracing::warn!(
            status = response.status().as_u16(),
            endpoint = %endpoint,
            "Relay returned an error, forwarding body unchanged"
        );
        return response;
    }

    let (mut parts, body) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(NDJSON_CONTENT_TYPE),
    );

    Response::from_parts(parts, transcode_response_body(body, endpoint))
}
