// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The retrieval engine.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use ragweave_core::error::RagError;
use ragweave_core::keys::KeyBuilder;
use ragweave_core::traits::{DocumentStore, EmbeddingProvider};
use ragweave_core::types::{ScoredDocument, SearchMode};

use crate::fusion::{fuse, HybridConfig};
use crate::lexical::lexical_expression;

/// Retrieval over the document store and embedder.
pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Dispatches one search by mode. `SearchMode::None` returns nothing.
    pub async fn search(
        &self,
        mode: SearchMode,
        retrieval_prefix: &str,
        query: &str,
        k: usize,
        min_score: f32,
        hybrid: Option<HybridConfig>,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        match mode {
            SearchMode::Similarity => self.cosine(retrieval_prefix, query, k, min_score).await,
            SearchMode::Knn => self.knn(retrieval_prefix, query, k, min_score).await,
            SearchMode::Lexical => self.lexical(retrieval_prefix, query, k).await,
            SearchMode::Hybrid => {
                let config = hybrid.unwrap_or_default();
                self.hybrid(retrieval_prefix, query, k, config).await
            }
            SearchMode::Semantic => self.semantic(retrieval_prefix, query, k).await,
            SearchMode::None => Ok(Vec::new()),
        }
    }

    /// Runs a search, retrying against the fallback-language prefix when the
    /// first pass comes back empty.
    #[allow(clippy::too_many_arguments)]
    pub async fn search_with_fallback(
        &self,
        mode: SearchMode,
        retrieval_prefix: &str,
        fallback_prefix: Option<&str>,
        query: &str,
        k: usize,
        min_score: f32,
        hybrid: Option<HybridConfig>,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let docs = self
            .search(mode, retrieval_prefix, query, k, min_score, hybrid)
            .await?;
        if !docs.is_empty() {
            return Ok(docs);
        }
        match fallback_prefix.filter(|fallback| *fallback != retrieval_prefix) {
            Some(fallback) => {
                debug!(fallback, "retrying retrieval with fallback language");
                self.search(mode, fallback, query, k, min_score, hybrid).await
            }
            None => Ok(docs),
        }
    }

    /// Direct cosine similarity against the vector index.
    pub async fn cosine(
        &self,
        retrieval_prefix: &str,
        query: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let embedding = self.embed_query(query).await?;
        let index = KeyBuilder::vector_index(retrieval_prefix);
        match self.store.vector_search(&index, &embedding, k, min_score).await {
            Ok(docs) => Ok(docs),
            Err(err) if err.is_index_missing() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// K-nearest retrieval: fetch the k closest neighbors, then apply the
    /// threshold to what came back.
    pub async fn knn(
        &self,
        retrieval_prefix: &str,
        query: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let embedding = self.embed_query(query).await?;
        let index = KeyBuilder::vector_index(retrieval_prefix);
        let docs = match self.store.vector_search(&index, &embedding, k, 0.0).await {
            Ok(docs) => docs,
            Err(err) if err.is_index_missing() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(docs.into_iter().filter(|d| d.score >= min_score).collect())
    }

    /// Token search against the full-text index. A query with no token
    /// longer than three characters returns empty without a store call.
    pub async fn lexical(
        &self,
        retrieval_prefix: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let Some(expression) = lexical_expression(query) else {
            return Ok(Vec::new());
        };
        let hits = match self.lexical_hits(retrieval_prefix, &expression, k).await {
            Ok(hits) => hits,
            Err(err) if err.is_index_missing() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(hits
            .into_iter()
            .map(|(mut doc, score)| {
                doc.score = score as f32;
                doc.metadata.insert(
                    "search_type".into(),
                    serde_json::Value::String("lexical".into()),
                );
                doc
            })
            .collect())
    }

    /// Vector + lexical with rank fusion, annotated and truncated to `k`.
    pub async fn hybrid(
        &self,
        retrieval_prefix: &str,
        query: &str,
        k: usize,
        config: HybridConfig,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let config = config.validated()?;

        let vector_results = match self
            .cosine(
                retrieval_prefix,
                query,
                config.max_results,
                config.min_vector_score,
            )
            .await
        {
            Ok(docs) => docs,
            Err(err) if err.is_index_missing() => Vec::new(),
            Err(err) => return Err(err),
        };

        let lexical_results = match lexical_expression(query) {
            Some(expression) => {
                match self
                    .lexical_hits(retrieval_prefix, &expression, config.max_results)
                    .await
                {
                    Ok(hits) => hits
                        .into_iter()
                        .filter(|(_, score)| *score >= config.min_lexical_score as f64)
                        .collect(),
                    Err(err) if err.is_index_missing() => Vec::new(),
                    Err(err) => return Err(err),
                }
            }
            None => Vec::new(),
        };

        let mut fused = fuse(vector_results, lexical_results, &config);
        fused.truncate(k);
        Ok(fused)
    }

    /// Hybrid search with default weights and a candidate pool of `k * 2`.
    pub async fn semantic(
        &self,
        retrieval_prefix: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let config = HybridConfig {
            max_results: k * 2,
            ..HybridConfig::default()
        };
        self.hybrid(retrieval_prefix, query, k, config).await
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embedder.embed_batch(&[query.to_string()]).await?;
        vectors.pop().ok_or_else(|| RagError::Embedder {
            message: "embedder returned no vector for the query".into(),
            source: None,
        })
    }

    /// Raw lexical hits as (document, score) pairs, creating the text index
    /// on first use so later writes under the prefix become searchable.
    async fn lexical_hits(
        &self,
        retrieval_prefix: &str,
        expression: &str,
        limit: usize,
    ) -> Result<Vec<(ScoredDocument, f64)>, RagError> {
        let index = KeyBuilder::text_index(retrieval_prefix);
        self.store
            .create_text_index(&index, &KeyBuilder::doc_key_prefix(retrieval_prefix))
            .await?;
        let hits = self.store.text_search(&index, expression, limit).await?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let mut metadata: HashMap<String, serde_json::Value> = hit
                    .attributes
                    .iter()
                    .filter(|(name, _)| name.as_str() != "content")
                    .map(|(name, value)| {
                        (name.clone(), serde_json::Value::String(value.clone()))
                    })
                    .collect();
                metadata.insert("id".into(), serde_json::Value::String(hit.key.clone()));
                let doc = ScoredDocument {
                    page_content: hit.attributes.get("content").cloned().unwrap_or_default(),
                    score: hit.score as f32,
                    metadata,
                };
                (doc, hit.score)
            })
            .collect())
    }
}
