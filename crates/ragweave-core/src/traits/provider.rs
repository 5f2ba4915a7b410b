// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM provider capability trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RagError;
use crate::types::{ChatRequest, ChatResponse, StreamChunk};

/// A boxed stream of provider output chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, RagError>> + Send>>;

/// Capability interface for LLM providers.
///
/// The runtime never inspects concrete provider types; anything that can
/// complete and stream chat requests plugs in here. Cancellation flows
/// through the caller dropping the returned stream.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a request and returns the full response, including any tool
    /// calls the model decided to make.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, RagError>;

    /// Sends a request and returns a stream of response chunks.
    async fn stream(&self, request: ChatRequest) -> Result<ChunkStream, RagError>;
}
