//! Augment `chat-stream` request → OpenAI chat-completion request.

use crate::api::models::{
    AugmentChatStreamRequest, AugmentThirdPartyOverride, AugmentToolDefinition,
    ChatCompletionRequest, FunctionDeclaration, Message, ToolDeclaration,
};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use std::collections::HashMap;
use std::fmt::Write as _;
use thiserror::Error;

/// Failure to decode a `third_party_override` blob. Never surfaced to clients.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("override is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("override is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the resolved model name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Override,
    Request,
    Default,
}

impl ModelSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            ModelSource::Override => "third_party_override",
            ModelSource::Request => "request",
            ModelSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub name: String,
    pub source: ModelSource,
}

/// Build the canonical request for the backend. The result always streams.
pub fn translate_request(
    req: &AugmentChatStreamRequest,
    default_model: &str,
) -> ChatCompletionRequest {
    let mut messages: Vec<Message> = req
        .chat_history
        .iter()
        .map(|h| Message::text(h.role.clone(), h.content.clone()))
        .collect();
    messages.push(Message::text("user", build_user_content(req)));

    let resolved = resolve_model(req, default_model);
    tracing::debug!(
        model = %resolved.name,
        model_source = resolved.source.as_str(),
        history = req.chat_history.len(),
        blobs = req.blobs.len(),
        tools = req.tool_definitions.len(),
        mode = req.mode.as_deref().unwrap_or(""),
        conversation_id = req.conversation_id.as_deref().unwrap_or(""),
        "Translated Augment request"
    );

    let tools = if req.tool_definitions.is_empty() {
        None
    } else {
        Some(convert_tools(&req.tool_definitions))
    };

    ChatCompletionRequest {
        model: resolved.name,
        messages,
        stream: true,
        tools,
        extra: HashMap::new(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// The current user turn: the message followed by one delimited section per
/// present context field.
pub fn build_user_content(req: &AugmentChatStreamRequest) -> String {
    let mut content = req.message.clone();

    let sections = [
        ("Selected Code", &req.selected_code),
        ("Code Before", &req.prefix),
        ("Code After", &req.suffix),
        ("File Path", &req.path),
        ("Language", &req.lang),
    ];
    for (title, value) in sections {
        if let Some(value) = non_empty(value) {
            let _ = write!(content, "\n\n--- {} ---\n{}", title, value);
        }
    }

    if !req.blobs.is_empty() {
        content.push_str("\n\n--- Related Files ---\n");
        for blob in &req.blobs {
            if !blob.path.is_empty() {
                let _ = write!(content, "\n// {}\n", blob.path);
            }
            content.push_str(&blob.content);
            content.push('\n');
        }
    }

    content
}

/// Resolve the backend model: override blob, then request field, then default.
pub fn resolve_model(req: &AugmentChatStreamRequest, default_model: &str) -> ResolvedModel {
    model_from_override(req)
        .map(|name| ResolvedModel {
            name,
            source: ModelSource::Override,
        })
        .or_else(|| {
            non_empty(&req.model).map(|name| ResolvedModel {
                name: name.to_string(),
                source: ModelSource::Request,
            })
        })
        .unwrap_or_else(|| ResolvedModel {
            name: default_model.to_string(),
            source: ModelSource::Default,
        })
}

fn model_from_override(req: &AugmentChatStreamRequest) -> Option<String> {
    let encoded = non_empty(&req.third_party_override)?;
    match decode_third_party_override(encoded) {
        Ok(decoded) => decoded.provider_model_name.filter(|name| !name.is_empty()),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring undecodable third_party_override");
            None
        }
    }
}

/// Decode a base64 (standard, then URL-safe alphabet) JSON override blob.
pub fn decode_third_party_override(
    encoded: &str,
) -> Result<AugmentThirdPartyOverride, OverrideError> {
    let decoded = STANDARD
        .decode(encoded)
        .or_else(|_| URL_SAFE.decode(encoded))?;
    Ok(serde_json::from_slice(&decoded)?)
}

fn convert_tools(tools: &[AugmentToolDefinition]) -> Vec<ToolDeclaration> {
    tools
        .iter()
        .map(|tool| ToolDeclaration {
            tool_type: "function".to_string(),
            function: FunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone().filter(|d| !d.is_empty()),
                parameters: tool.parameters.clone(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{AugmentBlob, AugmentChatHistory};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(message: &str) -> AugmentChatStreamRequest {
        AugmentChatStreamRequest {
            message: message.to_string(),
            ..Default::default()
        }
    }

    fn encode_override(json: &serde_json::Value) -> String {
        STANDARD.encode(json.to_string())
    }

    #[test]
    fn test_plain_message() {
        let req = request("hello");
        assert_eq!(build_user_content(&req), "hello");
    }

    #[test]
    fn test_sections_in_fixed_order() {
        let req = AugmentChatStreamRequest {
            message: "Explain".to_string(),
            lang: Some("rust".to_string()),
            path: Some("src/lib.rs".to_string()),
            suffix: Some("}".to_string()),
            prefix: Some("fn main() {".to_string()),
            selected_code: Some("let x = 1;".to_string()),
            blobs: vec![
                AugmentBlob {
                    path: "a.rs".to_string(),
                    content: "mod a;".to_string(),
                },
                AugmentBlob {
                    path: String::new(),
                    content: "anon".to_string(),
                },
            ],
            ..Default::default()
        };

        assert_eq!(
            build_user_content(&req),
            "Explain\
             \n\n--- Selected Code ---\nlet x = 1;\
             \n\n--- Code Before ---\nfn main() {\
             \n\n--- Code After ---\n}\
             \n\n--- File Path ---\nsrc/lib.rs\
             \n\n--- Language ---\nrust\
             \n\n--- Related Files ---\n\
             \n// a.rs\nmod a;\n\
             anon\n"
        );
    }

    #[test]
    fn test_empty_optional_fields_are_skipped() {
        let req = AugmentChatStreamRequest {
            message: "hi".to_string(),
            selected_code: Some(String::new()),
            path: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(build_user_content(&req), "hi");
    }

    #[test]
    fn test_history_copied_then_user_turn() {
        let req = AugmentChatStreamRequest {
            message: "next".to_string(),
            chat_history: vec![
                AugmentChatHistory {
                    role: "user".to_string(),
                    content: "q".to_string(),
                },
                AugmentChatHistory {
                    role: "assistant".to_string(),
                    content: "a".to_string(),
                },
            ],
            ..Default::default()
        };

        let out = translate_request(&req, "gpt-4o");
        assert_eq!(
            out.messages,
            vec![
                Message::text("user", "q"),
                Message::text("assistant", "a"),
                Message::text("user", "next"),
            ]
        );
        assert!(out.stream);
        assert!(out.tools.is_none());
    }

    #[test]
    fn test_model_from_override_standard_base64() {
        let req = AugmentChatStreamRequest {
            model: Some("request-model".to_string()),
            third_party_override: Some(encode_override(&json!({
                "providerModelName": "override-model",
                "apiKey": "k",
                "baseUrl": "http://x"
            }))),
            ..request("hi")
        };
        let resolved = resolve_model(&req, "gpt-4o");
        assert_eq!(resolved.name, "override-model");
        assert_eq!(resolved.source, ModelSource::Override);
    }

    #[test]
    fn test_model_from_override_url_safe_base64() {
        // Chosen so the standard encoding contains '+' or '/'.
        let payload = json!({"providerModelName": "m>>?"}).to_string();
        let encoded = URL_SAFE.encode(&payload);
        assert!(encoded.contains('-') || encoded.contains('_'));

        let decoded = decode_third_party_override(&encoded).unwrap();
        assert_eq!(decoded.provider_model_name.as_deref(), Some("m>>?"));
    }

    #[test]
    fn test_invalid_override_falls_through_to_request_model() {
        let req = AugmentChatStreamRequest {
            model: Some("request-model".to_string()),
            third_party_override: Some("!!!not base64!!!".to_string()),
            ..request("hi")
        };
        let resolved = resolve_model(&req, "gpt-4o");
        assert_eq!(resolved.name, "request-model");
        assert_eq!(resolved.source, ModelSource::Request);
    }

    #[test]
    fn test_override_with_bad_json_falls_through() {
        let req = AugmentChatStreamRequest {
            third_party_override: Some(STANDARD.encode("not json")),
            ..request("hi")
        };
        assert!(matches!(
            decode_third_party_override(req.third_party_override.as_deref().unwrap()),
            Err(OverrideError::Json(_))
        ));
        assert_eq!(resolve_model(&req, "fallback").source, ModelSource::Default);
    }

    #[test]
    fn test_override_without_model_falls_through() {
        let req = AugmentChatStreamRequest {
            model: Some("request-model".to_string()),
            third_party_override: Some(encode_override(&json!({"providerModelName": ""}))),
            ..request("hi")
        };
        assert_eq!(resolve_model(&req, "gpt-4o").name, "request-model");
    }

    #[test]
    fn test_default_model() {
        let req = AugmentChatStreamRequest {
            model: Some(String::new()),
            ..request("hi")
        };
        let resolved = resolve_model(&req, "gpt-4o");
        assert_eq!(resolved.name, "gpt-4o");
        assert_eq!(resolved.source, ModelSource::Default);
    }

    #[test]
    fn test_tools_mapped_one_to_one() {
        let req = AugmentChatStreamRequest {
            tool_definitions: vec![
                AugmentToolDefinition {
                    name: "read_file".to_string(),
                    description: Some("Read a file".to_string()),
                    parameters: Some(json!({"type": "object", "properties": {"path": {"type": "string"}}})),
                },
                AugmentToolDefinition {
                    name: "noop".to_string(),
                    description: None,
                    parameters: None,
                },
            ],
            ..request("hi")
        };

        let out = serde_json::to_value(translate_request(&req, "gpt-4o")).unwrap();
        assert_eq!(
            out["tools"],
            json!([
                {
                    "type": "function",
                    "function": {
                        "name": "read_file",
                        "description": "Read a file",
                        "parameters": {"type": "object", "properties": {"path": {"type": "string"}}}
                    }
                },
                {"type": "function", "function": {"name": "noop"}}
            ])
        );
        assert_eq!(out["stream"], json!(true));
    }
}
