// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store capability trait.
//!
//! The store holds three kinds of data: JSON records (embedding objects and
//! raw memory), chunk documents addressable by key prefix, and the secondary
//! indexes over them (TAG over record key lists, TEXT over chunk content,
//! VECTOR over chunk embeddings). Index creation is idempotent everywhere.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RagError;
use crate::types::ScoredDocument;

/// A chunk ready to be written to a vector index.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub content: String,
    pub embedding: Vec<f32>,
    /// Flat string attributes stored alongside the chunk (`rawkey`,
    /// `sources`, ...). Returned verbatim in search hits.
    pub metadata: HashMap<String, String>,
}

/// A hit from a full-text search.
#[derive(Debug, Clone)]
pub struct TextHit {
    pub key: String,
    pub score: f64,
    pub attributes: HashMap<String, String>,
}

/// A hit from a tag-index search.
#[derive(Debug, Clone)]
pub struct TagHit {
    pub key: String,
    pub fields: HashMap<String, String>,
}

/// Typed operations over the external K/V + vector store.
///
/// All operations are one call, one round trip. Failures surface as
/// [`RagError::Store`]; a lookup against an index that was never created
/// surfaces as [`RagError::IndexMissing`], which retrieval callers treat as
/// an empty result.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Verifies connectivity.
    async fn ping(&self) -> Result<(), RagError>;

    /// Writes a JSON record, replacing any existing value.
    async fn put_json(&self, key: &str, value: &serde_json::Value) -> Result<(), RagError>;

    /// Reads a JSON record. `Ok(None)` when the key does not exist.
    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, RagError>;

    /// Deletes a JSON record and drops it from the named tag index.
    async fn del_json(&self, key: &str, tag_index: &str) -> Result<(), RagError>;

    /// Deletes every key matching a glob pattern. Returns the number of
    /// keys removed.
    async fn del_by_pattern(&self, pattern: &str) -> Result<usize, RagError>;

    /// Lists keys matching a glob pattern.
    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, RagError>;

    /// Sets a time-to-live on a key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RagError>;

    /// Creates the tag index projecting `Keys` / `GeneralKeys` out of JSON
    /// records under `key_prefix`. No-op when it already exists.
    async fn create_tag_index(&self, name: &str, key_prefix: &str) -> Result<(), RagError>;

    /// Creates a full-text index over the `content` field of chunk documents
    /// under `key_prefix`. No-op when it already exists.
    async fn create_text_index(&self, name: &str, key_prefix: &str) -> Result<(), RagError>;

    /// Creates a cosine-metric vector index with the given dimension.
    /// No-op when it already exists.
    async fn create_vector_index(&self, name: &str, dimensions: usize) -> Result<(), RagError>;

    /// Writes chunks under `key_prefix`, making them visible to the named
    /// vector index. Creates the index from the first chunk's dimension if
    /// needed. Returns the generated chunk keys in input order.
    async fn add_chunks(
        &self,
        index: &str,
        key_prefix: &str,
        chunks: Vec<ChunkRecord>,
    ) -> Result<Vec<String>, RagError>;

    /// K-nearest search by cosine similarity, dropping hits below
    /// `min_score`.
    async fn vector_search(
        &self,
        index: &str,
        query: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError>;

    /// Full-text search with a store-native filter expression.
    async fn text_search(
        &self,
        index: &str,
        expression: &str,
        limit: usize,
    ) -> Result<Vec<TextHit>, RagError>;

    /// Tag-index search returning the requested projected fields.
    async fn tag_search(
        &self,
        index: &str,
        expression: &str,
        return_fields: &[&str],
    ) -> Result<Vec<TagHit>, RagError>;
}
