// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider for deterministic testing.
//!
//! `MockLlm` implements [`LlmProvider`] with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls. Streamed
//! responses are emitted one character per chunk so sentinel handling
//! (refusal `@`, reference `⧉`) is exercised the way real token streams
//! exercise it.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use ragweave_core::error::RagError;
use ragweave_core::traits::{ChunkStream, LlmProvider};
use ragweave_core::types::{
    ChatRequest, ChatResponse, StreamChunk, StreamEventType, TokenUsage, ToolCall,
};

/// One scripted reply, optionally carrying tool calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ScriptedResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// A mock LLM provider that pops replies from a FIFO queue.
///
/// When the queue is empty a default `"mock response"` text is returned.
/// Every request is recorded and can be inspected afterwards.
pub struct MockLlm {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Pre-loads plain text responses.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let llm = Self::new();
        {
            let mut queue = llm.responses.lock().expect("response lock");
            queue.extend(responses.into_iter().map(|s| ScriptedResponse::text(s)));
        }
        llm
    }

    /// Appends a plain text response to the queue.
    pub fn push_response(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .expect("response lock")
            .push_back(ScriptedResponse::text(text));
    }

    /// Appends a scripted response (text + tool calls) to the queue.
    pub fn push_scripted(&self, response: ScriptedResponse) {
        self.responses
            .lock()
            .expect("response lock")
            .push_back(response);
    }

    /// All requests seen so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("request lock").clone()
    }

    /// Number of provider calls made (complete + stream).
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("request lock").len()
    }

    fn next_response(&self) -> ScriptedResponse {
        self.responses
            .lock()
            .expect("response lock")
            .pop_front()
            .unwrap_or_else(|| ScriptedResponse::text("mock response"))
    }

    fn record(&self, request: &ChatRequest) {
        self.requests.lock().expect("request lock").push(request.clone());
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, RagError> {
        self.record(&request);
        let scripted = self.next_response();
        let output_tokens = scripted.content.split_whitespace().count() as u32;
        Ok(ChatResponse {
            content: scripted.content,
            tool_calls: scripted.tool_calls,
            stop_reason: Some("end_turn".to_string()),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens,
            },
        })
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChunkStream, RagError> {
        self.record(&request);
        let scripted = self.next_response();
        let output_tokens = scripted.content.chars().count() as u32;

        let mut chunks: Vec<Result<StreamChunk, RagError>> =
            vec![Ok(StreamChunk::event(StreamEventType::MessageStart))];
        chunks.extend(
            scripted
                .content
                .chars()
                .map(|c| Ok(StreamChunk::delta(c.to_string()))),
        );
        chunks.push(Ok(StreamChunk {
            event: StreamEventType::MessageDelta,
            text: None,
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens,
            }),
            stop_reason: Some("end_turn".to_string()),
            error: None,
        }));
        chunks.push(Ok(StreamChunk::event(StreamEventType::MessageStop)));

        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![],
            temperature: 0.0,
            top_p: 0.0,
            max_tokens: None,
            model: None,
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let llm = MockLlm::with_responses(["first", "second"]);
        assert_eq!(llm.complete(request()).await.unwrap().content, "first");
        assert_eq!(llm.complete(request()).await.unwrap().content, "second");
        assert_eq!(llm.complete(request()).await.unwrap().content, "mock response");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn stream_emits_one_char_per_delta() {
        let llm = MockLlm::with_responses(["ab"]);
        let mut stream = llm.stream(request()).await.unwrap();

        let mut deltas = Vec::new();
        let mut saw_stop = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            match chunk.event {
                StreamEventType::ContentBlockDelta => deltas.push(chunk.text.unwrap()),
                StreamEventType::MessageStop => saw_stop = true,
                _ => {}
            }
        }
        assert_eq!(deltas, vec!["a", "b"]);
        assert!(saw_stop);
    }

    #[tokio::test]
    async fn scripted_tool_calls_surface_in_complete() {
        let llm = MockLlm::new();
        llm.push_scripted(ScriptedResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call-1".into(),
                name: "lookup".into(),
                arguments: r#"{"city":"Porto"}"#.into(),
            }],
        });

        let response = llm.complete(request()).await.unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "lookup");
    }
}
