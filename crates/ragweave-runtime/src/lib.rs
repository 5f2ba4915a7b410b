// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ragweave runtime: a retrieval-augmented generation orchestrator.
//!
//! A [`Runtime`] mediates between a caller and pluggable LLM/embedding
//! providers: it ingests text, files, and URLs into a dual-scoped
//! vector + lexical index, retrieves hybrid context for each query, merges
//! rolling session memory, composes a provider-agnostic prompt, streams the
//! model's tokens back through an interceptor pipeline, and persists the
//! exchange for future retrieval.

pub mod ask;
pub mod config;
pub mod ingest;
pub mod language;
pub mod options;
pub mod prompt;
pub mod safety;
pub mod stream;
pub mod vision;

mod runtime;

pub use ask::{ActionRecord, AskAction, AskResult};
pub use config::RuntimeConfig;
pub use language::ChannelEventSink;
pub use options::{AskOptions, AskOptionsBuilder, ToolHandler, ToolSet};
pub use runtime::Runtime;
pub use safety::SafetyVerdict;

// The request surface re-exports what callers need without reaching into
// the component crates.
pub use ragweave_core::{
    ChatMessage, ChatRole, Flow, RagError, ScoredDocument, SearchMode, SessionEventSink,
    TokenReport, TokenSink, ToolSpec, TranscribeConfig, Transcriber,
};
pub use ragweave_index::{EmbeddingContent, EmbeddingList, EmbeddingObject, IndexRequest};
pub use ragweave_memory::MemoryTurn;
pub use ragweave_retrieval::HybridConfig;
