//! HTTP middleware for request metrics.

use crate::core::metrics::get_metrics;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Middleware for tracking request metrics.
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Track metrics for incoming requests.
    ///
    /// For streaming endpoints `next.run()` returns once headers are ready,
    /// so the recorded duration is time to first byte.
    pub async fn track_metrics(request: Request, next: Next) -> Response {
        let endpoint = request.uri().path().to_string();
        let method = request.method().to_string();

        // Skip metrics endpoint itself to avoid recursion
        if endpoint == "/metrics" {
            return next.run(request).await;
        }

        let start = Instant::now();
        let response = next.run(request).await;
        let duration = start.elapsed().as_secs_f64();
        let status_code = response.status().as_u16().to_string();

        let metrics = get_metrics();
        metrics
            .request_count
            .with_label_values(&[&method, &endpoint, &status_code])
            .inc();
        metrics
            .request_duration
            .with_label_values(&[&method, &endpoint])
            .observe(duration);

        tracing::info!(
            method = %method,
            endpoint = %endpoint,
            status = %status_code,
            ttfb_secs = format!("{:.3}", duration),
            "Request completed"
        );

        response
    }
}
