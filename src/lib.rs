//! Augment Proxy - bridges the Augment editor plugin to OpenAI-compatible backends
//!
//! The plugin speaks its own `chat-stream` protocol: a single request carrying
//! the user message, editor context and conversation history, answered by a
//! stream of newline-delimited JSON records. This crate translates that request
//! into a streaming chat-completion call and transcodes the backend's
//! Server-Sent Events back into the plugin's record format as they arrive.
//!
//! # Architecture
//!
//! - [`core`]: Core functionality (config, errors, logging context, metrics, middleware)
//! - [`api`]: HTTP handlers, the Augment middleware and request/response models
//! - [`transformer`]: Request translation and the SSE to NDJSON stream transcoder
//!
//! # Configuration
//!
//! Optional environment variables:
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 18000)
//! - `UPSTREAM_API_BASE`: Backend base URL (default: http://localhost:3000/v1)
//! - `UPSTREAM_API_KEY`: Bearer key for the backend (default: none)
//! - `DEFAULT_MODEL`: Model used when the request names none (default: gpt-4o)
//! - `VERIFY_SSL`: Verify SSL certificates for upstream (default: true)
//! - `REQUEST_TIMEOUT_SECS`: Request timeout in seconds (default: 300)

pub mod api;
pub mod core;
pub mod transformer;

// Re-export commonly used types for convenience
pub use api::{app_router, AppState, AugmentChatStreamRequest, ChatCompletionRequest};
pub use core::{AppConfig, AppError, Result};
pub use transformer::{StopCode, StreamTranscoder};
