//! Configuration management for the Augment bridge.
//!
//! Configuration is read from environment variables. `main` loads a `.env`
//! file through `dotenvy` before this module is consulted, so both sources
//! work the same way.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Largest request body accepted on any relay route.
pub const MAX_REQUEST_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend chat-completion endpoint the canonical request is relayed to
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Model used when neither the override blob nor the request names one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Whether to verify SSL certificates for upstream requests
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Request timeout in seconds for the upstream backend
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL, `/chat/completions` is appended
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bearer key; no Authorization header is sent when empty
    #[serde(default)]
    pub api_key: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
        }
    }
}

impl UpstreamConfig {
    /// Full URL of the chat-completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            default_model: default_model(),
            verify_ssl: default_verify_ssl(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    18000
}

fn default_api_base() -> String {
    "http://localhost:3000/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_verify_ssl() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    300
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use augment_proxy_rust::core::config::AppConfig;
    ///
    /// let config = AppConfig::from_env().expect("Failed to load config");
    /// println!("listening on {}:{}", config.server.host, config.server.port);
    /// ```
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }

        if let Ok(port_str) = std::env::var("PORT") {
            config.server.port = port_str
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port number: {}", port_str))?;
        }

        if let Ok(api_base) = std::env::var("UPSTREAM_API_BASE") {
            if !api_base.is_empty() {
                config.upstream.api_base = api_base;
            }
        }

        if let Ok(api_key) = std::env::var("UPSTREAM_API_KEY") {
            config.upstream.api_key = api_key;
        }

        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            if !model.is_empty() {
                config.default_model = model;
            }
        }

        if let Ok(verify_ssl_str) = std::env::var("VERIFY_SSL") {
            config.verify_ssl = str_to_bool(&verify_ssl_str);
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECS") {
            match timeout_str.parse::<u64>() {
                Ok(timeout) => config.request_timeout_secs = timeout,
                Err(_) => tracing::warn!(
                    value = %timeout_str,
                    default = config.request_timeout_secs,
                    "Ignoring invalid REQUEST_TIMEOUT_SECS"
                ),
            }
        }

        Ok(config)
    }
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
