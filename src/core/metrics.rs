//! Prometheus metrics for monitoring the Augment bridge.
//!
//! This module provides a centralized metrics registry for tracking requests,
//! latency, open streams and how each transcoded line was handled.

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint and status
    pub request_count: IntCounterVec,

    /// Request duration histogram in seconds (time to response headers)
    pub request_duration: HistogramVec,

    /// Number of response streams currently being transcoded
    pub active_streams: GaugeVec,

    /// Lines seen by the stream transcoder, labelled by outcome
    pub transcoded_lines: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// This should be called once at application startup. Subsequent calls
/// return the same instance.
///
/// # Examples
///
/// ```no_run
/// use augment_proxy_rust::core::metrics::init_metrics;
///
/// let metrics = init_metrics();
/// metrics.request_count.with_label_values(&["GET", "/health", "200"]).inc();
/// ```
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "augment_proxy_requests_total",
            "Total number of requests",
            &["method", "endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "augment_proxy_request_duration_seconds",
            "Request duration in seconds",
            &["method", "endpoint"],
            vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
        )
        .expect("Failed to register request_duration metric");

        let active_streams = register_gauge_vec!(
            "augment_proxy_active_streams",
            "Number of response streams currently being transcoded",
            &["endpoint"]
        )
        .expect("Failed to register active_streams metric");

        let transcoded_lines = register_int_counter_vec!(
            "augment_proxy_transcoded_lines_total",
            "Event-stream lines handled by the transcoder",
            &["outcome"]
        )
        .expect("Failed to register transcoded_lines metric");

        Metrics {
            request_count,
            request_duration,
            active_streams,
            transcoded_lines,
        }
    })
}

/// Get the global metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
