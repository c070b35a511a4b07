//! Conversion of one OpenAI stream chunk into one Augment `BackChatResult`.
//!
//! The plugin parses each NDJSON line into a fixed shape, so every collection
//! field of [`PluginOutputRecord`] is serialized even when empty.

use super::finish_reason::StopCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node type tag for thinking annotations.
pub const NODE_TYPE_THINKING: u8 = 8;

// ============================================================================
// Backend (OpenAI chat.completion.chunk) shape
// ============================================================================

/// One decoded `data:` payload from the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendStreamEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<StreamChoice>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl StreamDelta {
    /// `reasoning_content` when non-empty, else `reasoning`, else "".
    pub fn reasoning_text(&self) -> &str {
        [&self.reasoning_content, &self.reasoning]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|text| !text.is_empty())
            .unwrap_or("")
    }
}

// ============================================================================
// Plugin (Augment BackChatResult) shape
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginOutputRecord {
    pub text: String,
    pub unknown_blob_names: Vec<String>,
    pub checkpoint_not_found: bool,
    pub workspace_file_chunks: Vec<Value>,
    pub incorporated_external_sources: Vec<Value>,
    pub nodes: Vec<Node>,
    pub stop_reason: Option<StopCode>,
}

impl Default for PluginOutputRecord {
    fn default() -> Self {
        Self {
            text: String::new(),
            unknown_blob_names: Vec::new(),
            checkpoint_not_found: false,
            workspace_file_chunks: Vec::new(),
            incorporated_external_sources: Vec::new(),
            nodes: Vec::new(),
            stop_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: u32,
    #[serde(rename = "type")]
    pub node_type: u8,
    pub content: String,
    pub tool_use: Option<Value>,
    pub thinking: Option<Thinking>,
    pub billing_metadata: Option<Value>,
    pub metadata: Option<NodeMetadata>,
    pub token_usage: Option<Value>,
}

impl Node {
    /// A thinking node carrying `summary`; every other slot is a placeholder.
    pub fn thinking(summary: impl Into<String>) -> Self {
        Self {
            id: 0,
            node_type: NODE_TYPE_THINKING,
            content: String::new(),
            tool_use: None,
            thinking: Some(Thinking {
                summary: summary.into(),
                content: None,
                openai_responses_api_item_id: None,
            }),
            billing_metadata: None,
            metadata: Some(NodeMetadata::default()),
            token_usage: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thinking {
    pub summary: String,
    pub content: Option<Value>,
    pub openai_responses_api_item_id: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeMetadata {
    pub openai_id: String,
    pub google_ts: Option<Value>,
    pub provider: Option<Value>,
}

impl From<&BackendStreamEvent> for PluginOutputRecord {
    fn from(event: &BackendStreamEvent) -> Self {
        let mut record = PluginOutputRecord::default();

        let Some(choice) = event.choices.as_ref().and_then(|c| c.first()) else {
            return record;
        };

        if let Some(delta) = &choice.delta {
            record.text = delta.content.clone().unwrap_or_default();

            let reasoning = delta.reasoning_text();
            if !reasoning.is_empty() {
                record.nodes.push(Node::thinking(reasoning));
            }
        }

        if let Some(reason) = choice.finish_reason.as_deref().filter(|r| !r.is_empty()) {
            record.stop_reason = Some(StopCode::from_finish_reason(reason));
        }

        record
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Result of converting one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// Payload decoded and re-encoded as a plugin record.
    Converted(String),
    /// Payload could not be converted and is forwarded as-is.
    Passthrough(String),
}

impl Conversion {
    pub fn into_line(self) -> String {
        match self {
            Conversion::Converted(line) | Conversion::Passthrough(line) => line,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Conversion::Converted(_))
    }
}

/// Convert one `data:` payload into a single NDJSON line (without terminator).
///
/// Payloads that do not decode as a stream chunk are passed through
/// unchanged. A literal `null` decodes to an empty record.
pub fn convert_payload(payload: &str) -> Conversion {
    let event = match serde_json::from_str::<Option<BackendStreamEvent>>(payload) {
        Ok(event) => event.unwrap_or_default(),
        Err(e) => {
            tracing::debug!(error = %e, "Stream payload is not a chat chunk, passing through");
            return Conversion::Passthrough(payload.to_string());
        }
    };

    let record = PluginOutputRecord::from(&event);
    match serde_json::to_string(&record) {
        Ok(line) => Conversion::Converted(line),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize plugin record, passing through");
            Conversion::Passthrough(payload.to_string())
        }
    }
}
