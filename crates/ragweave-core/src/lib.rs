// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the ragweave RAG runtime.
//!
//! This crate provides the foundational trait definitions, error type, key
//! layout, and common message/document types used throughout the ragweave
//! workspace. Store and provider adapters implement traits defined here.

pub mod error;
pub mod keys;
pub mod registry;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RagError;
pub use keys::{sanitize, KeyBuilder};
pub use registry::{ProviderRegistry, ProviderSettings};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, ChatRole, Flow, MessagePart, ScoredDocument,
    SearchMode, StreamChunk, StreamEventType, TokenReport, TokenUsage, ToolCall, ToolResult,
    ToolSpec,
};

// Re-export all capability traits at crate root.
pub use traits::{
    ChunkRecord, ChunkStream, DocumentStore, EmbeddingProvider, LlmProvider, SessionEventSink,
    TagHit, TextHit, TokenSink, TranscribeConfig, Transcriber, Transcript, VisionProvider,
};
