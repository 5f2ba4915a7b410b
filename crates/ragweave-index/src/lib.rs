// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline: text cleanup, chunking, and dual-scoped indexing.
//!
//! Text enters through [`Indexer::embed_content`], gets cleaned and split
//! into overlapping chunks (character windows or LLM-guided semantic
//! blocks), embedded, and written to both the per-index and the global
//! vector scope, with the owning [`EmbeddingObject`] record tracking every
//! chunk key for later replacement or cascaded deletion.

pub mod chunker;
pub mod cleanup;
pub mod indexer;
pub mod llm_chunker;

pub use chunker::{split_text, split_windows, token_count, ChunkerConfig, MIN_CHUNK_TOKENS};
pub use cleanup::{aggressive_cleanup, cleanup_context, cleanup_text};
pub use indexer::{
    EmbedOutcome, EmbeddingContent, EmbeddingList, EmbeddingObject, IndexRequest, IndexScope,
    Indexer,
};
pub use llm_chunker::{LlmChunkOutcome, SemanticChunk, CHUNK_MARKER, KEYWORDS_MARKER};
