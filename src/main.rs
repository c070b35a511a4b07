//! Augment Proxy Server - Main entry point
//!
//! This binary creates and runs the HTTP server with all configured routes and middleware.
//! Configuration is loaded from environment variables (and `.env` if present).

use anyhow::{Context, Result};
use augment_proxy_rust::{
    api::{app_router, AppState},
    core::{init_metrics, AppConfig},
};
use chrono::Local;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or_else(|| detect_cpu_limit().unwrap_or(1));

    println!("Tokio runtime: using {} worker threads", worker_threads);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Custom time formatter that uses local timezone (respects TZ environment variable)
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

fn init_tracing() {
    // NO_COLOR disables ANSI codes for file logging
    let no_color = std::env::var("NO_COLOR").is_ok();

    let base_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,augment_proxy_rust=debug".to_string());

    // Noisy HTTP library logs stay suppressed even when RUST_LOG is set
    let filter_str = format!(
        "{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn",
        base_filter
    );
    let filter = tracing_subscriber::EnvFilter::new(filter_str);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTime)
                .with_ansi(!no_color),
        )
        .init();
}

async fn async_main() -> Result<()> {
    init_tracing();
    init_metrics();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(
        upstream = %config.upstream.chat_completions_url(),
        default_model = %config.default_model,
        verify_ssl = config.verify_ssl,
        timeout_secs = config.request_timeout_secs,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::new(config)?);
    let app = app_router(state);

    tracing::info!("Starting Augment Proxy on {}", addr);
    tracing::info!("Augment API: /chat-stream");
    tracing::info!("OpenAI API: /v1/chat/completions");
    tracing::info!("Metrics endpoint: /metrics");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Detect CPU limit from cgroup (for containerized environments)
fn detect_cpu_limit() -> Option<usize> {
    // cgroup v2
    if let Ok(max) = std::fs::read_to_string("/sys/fs/cgroup/cpu.max") {
        if let Some(cores) = parse_cgroup_v2(&max) {
            println!("Detected CPU limit from cgroup v2: {} cores", cores);
            return Some(cores);
        }
    }

    // cgroup v1
    let quota = read_i64("/sys/fs/cgroup/cpu/cpu.cfs_quota_us")?;
    let period = read_i64("/sys/fs/cgroup/cpu/cpu.cfs_period_us")?;
    let cores = quota_to_cores(quota, period)?;
    println!("Detected CPU limit from cgroup v1: {} cores", cores);
    Some(cores)
}

fn read_i64(path: &str) -> Option<i64> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn parse_cgroup_v2(max: &str) -> Option<usize> {
    let mut parts = max.split_whitespace();
    let quota = parts.next()?.parse::<i64>().ok()?;
    let period = parts.next()?.parse::<i64>().ok()?;
    quota_to_cores(quota, period)
}

fn quota_to_cores(quota: i64, period: i64) -> Option<usize> {
    if quota > 0 && period > 0 {
        Some(((quota as f64 / period as f64).ceil() as usize).max(1))
    } else {
        None
    }
}
