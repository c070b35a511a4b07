//! Logging utilities with request context support.
//!
//! Every inbound request gets an ID that is kept in task-local storage so
//! log lines emitted deep inside the relay can be correlated without passing
//! it through every function call.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

/// Header used to echo the request ID back to the client.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Assign a request ID, run the rest of the stack inside its scope and echo
/// it on the response.
///
/// A well-formed `x-request-id` supplied by the client is reused.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(|v| v.to_string())
        .unwrap_or_else(generate_request_id);

    let mut response = REQUEST_ID
        .scope(request_id.clone(), async move { next.run(request).await })
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
