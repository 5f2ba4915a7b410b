// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the ragweave runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role of a chat message in the provider-agnostic message format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    Human,
    Ai,
    Tool,
}

/// One part of a chat message. Most messages carry a single `Text` part;
/// tool exchanges carry `ToolCall` / `ToolResult` parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessagePart {
    Text(String),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// A provider-agnostic chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    /// Builds a single-part text message with the given role.
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![MessagePart::Text(content.into())],
        }
    }

    /// Concatenated text of all `Text` parts.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object, exactly as the provider returned it.
    pub arguments: String,
}

/// The result of executing a tool, sent back as a tool-role message part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
}

/// Declaration of a tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A request to an LLM provider.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: Option<u32>,
    /// Overrides the provider's default model when set.
    pub model: Option<String>,
    pub tools: Vec<ToolSpec>,
}

/// A full (non-streamed) response from an LLM provider.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

/// Event taxonomy for streamed provider output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventType {
    MessageStart,
    ContentBlockDelta,
    MessageDelta,
    MessageStop,
    Error,
}

/// A single chunk from a streaming LLM provider response.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    pub event: StreamEventType,
    pub text: Option<String>,
    pub usage: Option<TokenUsage>,
    pub stop_reason: Option<String>,
    pub error: Option<String>,
}

impl StreamChunk {
    /// A text delta chunk.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            event: StreamEventType::ContentBlockDelta,
            text: Some(text.into()),
            usage: None,
            stop_reason: None,
            error: None,
        }
    }

    /// A bare lifecycle event with no payload.
    pub fn event(event: StreamEventType) -> Self {
        Self {
            event,
            text: None,
            usage: None,
            stop_reason: None,
            error: None,
        }
    }
}

/// Token counts for a single provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Per-stage token accounting for one orchestrated request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenReport {
    pub completion: TokenUsage,
    pub language_detection: TokenUsage,
    pub memory_summarization: TokenUsage,
    pub safety_check: TokenUsage,
}

/// A document returned by retrieval, scored and annotated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub page_content: String,
    pub score: f32,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ScoredDocument {
    /// String form of a metadata attribute, when present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Retrieval mode selected per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Direct cosine similarity against the vector index (default).
    #[default]
    Similarity,
    /// K-nearest-neighbor retrieval over the same index.
    Knn,
    /// Token search against the full-text index only.
    Lexical,
    /// Vector + lexical with rank fusion.
    Hybrid,
    /// Hybrid with default weights and a widened candidate pool.
    Semantic,
    /// Skip retrieval entirely.
    None,
}

/// Flow control returned by a [`crate::traits::TokenSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn chat_message_text_roundtrip() {
        let msg = ChatMessage::text(ChatRole::Human, "hello");
        assert_eq!(msg.role, ChatRole::Human);
        assert_eq!(msg.text_content(), "hello");
    }

    #[test]
    fn text_content_skips_tool_parts() {
        let msg = ChatMessage {
            role: ChatRole::Ai,
            parts: vec![
                MessagePart::Text("a".into()),
                MessagePart::ToolCall(ToolCall {
                    id: "1".into(),
                    name: "t".into(),
                    arguments: "{}".into(),
                }),
                MessagePart::Text("b".into()),
            ],
        };
        assert_eq!(msg.text_content(), "ab");
    }

    #[test]
    fn search_mode_string_forms() {
        assert_eq!(SearchMode::Similarity.to_string(), "similarity");
        assert_eq!(SearchMode::from_str("hybrid").unwrap(), SearchMode::Hybrid);
        assert_eq!(SearchMode::from_str("none").unwrap(), SearchMode::None);
        assert_eq!(SearchMode::default(), SearchMode::Similarity);
    }

    #[test]
    fn token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        });
        total.add(TokenUsage {
            input_tokens: 1,
            output_tokens: 2,
        });
        assert_eq!(total.input_tokens, 11);
        assert_eq!(total.output_tokens, 7);
    }

    #[test]
    fn scored_document_metadata_access() {
        let mut doc = ScoredDocument::default();
        doc.metadata
            .insert("id".into(), serde_json::Value::String("doc:1".into()));
        assert_eq!(doc.metadata_str("id"), Some("doc:1"));
        assert_eq!(doc.metadata_str("missing"), None);
    }
}
