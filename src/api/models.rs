//! API request and response models.
//!
//! The Augment plugin request shapes and the canonical OpenAI chat-completion
//! request the bridge forwards to the backend.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Augment plugin request
// ============================================================================

/// Body of the plugin's `chat-stream` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AugmentChatStreamRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub selected_code: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chat_history: Vec<AugmentChatHistory>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blobs: Vec<AugmentBlob>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_definitions: Vec<AugmentToolDefinition>,
    /// Structured nodes from the plugin; accepted but not forwarded.
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<Value>,
    /// "CHAT" or "AGENT"
    #[serde(default)]
    pub mode: Option<String>,
    /// Base64-encoded JSON, see [`AugmentThirdPartyOverride`]
    #[serde(default)]
    pub third_party_override: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentChatHistory {
    /// "user" or "assistant"
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AugmentBlob {
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentToolDefinition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
}

/// Decoded `third_party_override` blob.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentThirdPartyOverride {
    #[serde(default)]
    pub provider_model_name: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl fmt::Debug for AugmentThirdPartyOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AugmentThirdPartyOverride")
            .field("provider_model_name", &self.provider_model_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ============================================================================
// Canonical chat-completion request
// ============================================================================

/// Chat completion request following the OpenAI API format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier
    pub model: String,

    /// Conversation messages
    pub messages: Vec<Message>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,

    /// Tool declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDeclaration>>,

    /// Additional provider-specific parameters
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A single message in a conversation.
///
/// `content` is kept as raw JSON so multimodal content arrays relay intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: Value,
}

impl Message {
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Value::String(content.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDeclaration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

// ============================================================================
// Misc responses
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
