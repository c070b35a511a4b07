//! Shared constants for structured API errors.

pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_TIMEOUT: &str = "timeout_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_INTERNAL: &str = "internal_error";

pub const ERROR_CODE_INVALID_REQUEST: &str = "invalid_request";
pub const ERROR_CODE_MARSHAL_FAILED: &str = "marshal_failed";
pub const ERROR_CODE_PAYLOAD_TOO_LARGE: &str = "payload_too_large";
pub const ERROR_CODE_UPSTREAM: &str = "upstream_error";
pub const ERROR_CODE_TIMEOUT: &str = "timeout";
pub const ERROR_CODE_INTERNAL: &str = "internal";

/// Outcome label for a single line passing through the stream transcoder.
pub const LINE_OUTCOME_CONVERTED: &str = "converted";
pub const LINE_OUTCOME_PASSTHROUGH: &str = "passthrough";
pub const LINE_OUTCOME_DROPPED: &str = "dropped";
