// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The indexing pipeline.
//!
//! An [`EmbeddingObject`] record owns every content ingested under a
//! `(prefix, index)` pair; each [`EmbeddingContent`] owns the chunk keys it
//! produced in both the scoped and the global vector scope. Re-ingesting a
//! content id deletes the prior keys before the record is committed, so the
//! record's key lists always point at live chunks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ragweave_core::error::RagError;
use ragweave_core::keys::KeyBuilder;
use ragweave_core::traits::{ChunkRecord, DocumentStore, EmbeddingProvider, LlmProvider};
use ragweave_core::types::ScoredDocument;

use crate::chunker::{split_text, ChunkerConfig};
use crate::cleanup::{aggressive_cleanup, cleanup_text};
use crate::llm_chunker::{split_with_llm, SemanticChunk};

/// A single ingested content with its live chunk keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingContent {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Language", default)]
    pub language: String,
    #[serde(rename = "Sources", default)]
    pub source: String,
    #[serde(rename = "Keywords", default)]
    pub keywords: Vec<String>,
    #[serde(rename = "Keys", default)]
    pub keys: Vec<String>,
    #[serde(rename = "GeneralKeys", default)]
    pub general_keys: Vec<String>,
}

impl EmbeddingContent {
    /// Snapshot carried in each chunk's `rawkey` metadata: the content
    /// descriptor without the raw text, for later referencing.
    fn rawkey_snapshot(&self) -> Result<String, RagError> {
        let mut snapshot = self.clone();
        snapshot.text = String::new();
        snapshot.keys = Vec::new();
        snapshot.general_keys = Vec::new();
        serde_json::to_string(&snapshot)
            .map_err(|e| RagError::Internal(format!("rawkey serialization failed: {e}")))
    }
}

/// The record stored under `rawDocs:<prefix>:<sanitized index>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingObject {
    #[serde(rename = "EmbeddingPrefix", default)]
    pub prefix: String,
    #[serde(rename = "Index", default)]
    pub index: String,
    #[serde(rename = "Contents", default)]
    pub contents: HashMap<String, EmbeddingContent>,
}

impl EmbeddingObject {
    pub fn record_key(&self) -> String {
        KeyBuilder::raw_docs_key(&self.prefix, &self.index)
    }
}

/// Paginated listing of embedding objects.
#[derive(Debug, Default)]
pub struct EmbeddingList {
    pub rows: Vec<EmbeddingObject>,
    pub total: usize,
}

/// Where a batch of chunks is written.
#[derive(Debug, Clone, Copy)]
pub enum IndexScope<'a> {
    /// Normal ingestion: scoped index plus (unless limited) the global one.
    Scoped {
        prefix: &'a str,
        index: &'a str,
        language: Option<&'a str>,
    },
    /// The caller's composed retrieval prefix is used verbatim and no
    /// global write happens. Used for session memory.
    Verbatim(&'a str),
}

/// Options for one ingestion call.
#[derive(Debug, Clone, Default)]
pub struct IndexRequest {
    pub prefix: String,
    pub language: Option<String>,
    /// Skip the cross-index (global) write.
    pub limit_global: bool,
    /// Run the aggressive cleanup pass on the text.
    pub cleanup_text: bool,
    /// Chunk with the LLM instead of character windows.
    pub use_llm_chunking: bool,
}

/// Result of writing one text through the pipeline.
#[derive(Debug, Default)]
pub struct EmbedOutcome {
    pub keys: Vec<String>,
    pub general_keys: Vec<String>,
    pub chunk_count: usize,
    pub keywords: Vec<String>,
    pub inconsistent: Vec<String>,
}

/// Writes chunked, embedded content into the document store.
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Option<Arc<dyn LlmProvider>>,
    config: ChunkerConfig,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
        config: ChunkerConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            llm,
            config,
        }
    }

    pub fn chunker_config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunks, embeds, and writes a text into its target scope(s).
    ///
    /// Returns the chunk keys created per scope; the caller owns recording
    /// them for later cleanup.
    #[allow(clippy::too_many_arguments)]
    pub async fn embed_text(
        &self,
        scope: IndexScope<'_>,
        title: &str,
        text: &str,
        source: &str,
        rawkey: Option<&str>,
        keywords: &[String],
        limit_global: bool,
        use_llm_chunking: bool,
    ) -> Result<EmbedOutcome, RagError> {
        let mut outcome = EmbedOutcome::default();

        let chunks: Vec<SemanticChunk> = if use_llm_chunking {
            let llm = self
                .llm
                .as_ref()
                .ok_or_else(|| RagError::MissingConfig("llm provider for chunking".into()))?;
            let llm_outcome = split_with_llm(llm.as_ref(), text, &self.config).await?;
            outcome.inconsistent = llm_outcome.inconsistent;
            llm_outcome.chunks
        } else {
            split_text(text, &self.config)
                .into_iter()
                .map(|content| SemanticChunk {
                    content,
                    keywords: Vec::new(),
                })
                .collect()
        };
        if chunks.is_empty() {
            return Ok(outcome);
        }

        // Merge per-block keywords with the content-level ones.
        let mut merged_keywords: Vec<String> = keywords.to_vec();
        for chunk in &chunks {
            for keyword in &chunk.keywords {
                if !merged_keywords.contains(keyword) {
                    merged_keywords.push(keyword.clone());
                }
            }
        }

        let bodies: Vec<String> = chunks
            .iter()
            .map(|chunk| {
                let mut body = String::new();
                if !title.is_empty() {
                    body.push_str("Title: ");
                    body.push_str(title);
                    body.push('\n');
                }
                body.push_str(&chunk.content);
                if !merged_keywords.is_empty() {
                    body.push_str("\nKeywords: ");
                    body.push_str(&merged_keywords.join(", "));
                }
                body
            })
            .collect();

        let embeddings = self.embedder.embed_batch(&bodies).await?;
        if embeddings.len() != bodies.len() {
            return Err(RagError::Embedder {
                message: format!(
                    "embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    bodies.len()
                ),
                source: None,
            });
        }

        let records: Vec<ChunkRecord> = bodies
            .iter()
            .zip(&embeddings)
            .map(|(body, embedding)| {
                let mut metadata = HashMap::new();
                if let Some(rawkey) = rawkey {
                    metadata.insert("rawkey".to_string(), rawkey.to_string());
                }
                if !source.is_empty() {
                    metadata.insert("sources".to_string(), source.to_string());
                }
                ChunkRecord {
                    content: body.clone(),
                    embedding: embedding.clone(),
                    metadata,
                }
            })
            .collect();

        let (scoped_prefix, global_prefix) = match scope {
            IndexScope::Scoped {
                prefix,
                index,
                language,
            } => (
                KeyBuilder::scoped_prefix(prefix, index, language),
                (!limit_global).then(|| KeyBuilder::global_prefix(prefix, language)),
            ),
            IndexScope::Verbatim(prefix) => (prefix.to_string(), None),
        };

        outcome.keys = self
            .store
            .add_chunks(
                &KeyBuilder::vector_index(&scoped_prefix),
                &KeyBuilder::doc_key_prefix(&scoped_prefix),
                records.clone(),
            )
            .await?;

        if let Some(global_prefix) = global_prefix {
            outcome.general_keys = self
                .store
                .add_chunks(
                    &KeyBuilder::vector_index(&global_prefix),
                    &KeyBuilder::doc_key_prefix(&global_prefix),
                    records,
                )
                .await?;
        }

        outcome.chunk_count = outcome.keys.len();
        outcome.keywords = merged_keywords;
        debug!(
            scoped = outcome.keys.len(),
            global = outcome.general_keys.len(),
            "text indexed"
        );
        Ok(outcome)
    }

    /// Ingests (or re-ingests) a content under `(prefix, index)`.
    ///
    /// Loads the prior record, replaces the content's chunks in both scopes,
    /// and persists the updated record with the tag index in place.
    pub async fn embed_content(
        &self,
        index: &str,
        mut content: EmbeddingContent,
        request: &IndexRequest,
    ) -> Result<EmbeddingObject, RagError> {
        let mut object = self
            .load_object(&request.prefix, index)
            .await?
            .unwrap_or_else(|| EmbeddingObject {
                prefix: request.prefix.clone(),
                index: index.to_string(),
                contents: HashMap::new(),
            });

        if content.id.is_empty() {
            content.id = uuid::Uuid::new_v4().to_string();
        }
        if content.language.is_empty() {
            if let Some(language) = &request.language {
                content.language = language.clone();
            }
        }
        content.text = if request.cleanup_text {
            aggressive_cleanup(&content.text)
        } else {
            cleanup_text(&content.text)
        };

        // Prior chunks of this content id go away before the new key lists
        // are committed to the record.
        if let Some(previous) = object.contents.get(&content.id) {
            for key in previous.keys.iter().chain(&previous.general_keys) {
                self.store.del_by_pattern(key).await?;
            }
        }

        let language = (!content.language.is_empty()).then_some(content.language.as_str());
        let rawkey = content.rawkey_snapshot()?;
        let outcome = self
            .embed_text(
                IndexScope::Scoped {
                    prefix: &request.prefix,
                    index,
                    language,
                },
                &content.title,
                &content.text.clone(),
                &content.source,
                Some(&rawkey),
                &content.keywords,
                request.limit_global,
                request.use_llm_chunking,
            )
            .await?;

        content.keywords = outcome.keywords;
        content.keys = outcome.keys;
        content.general_keys = outcome.general_keys;
        object.contents.insert(content.id.clone(), content);

        self.save_object(&object).await?;
        Ok(object)
    }

    /// Removes an embedding object and every chunk it owns, in both scopes.
    pub async fn remove_embedding(&self, prefix: &str, index: &str) -> Result<(), RagError> {
        let Some(object) = self.load_object(prefix, index).await? else {
            return Ok(());
        };
        for content in object.contents.values() {
            for key in content.keys.iter().chain(&content.general_keys) {
                self.store.del_by_pattern(key).await?;
            }
        }
        self.store
            .del_json(&object.record_key(), &KeyBuilder::tag_index(prefix))
            .await
    }

    /// Removes a single content from an embedding object; drops the whole
    /// record when it becomes empty.
    pub async fn remove_embedding_content(
        &self,
        prefix: &str,
        index: &str,
        content_id: &str,
    ) -> Result<(), RagError> {
        let Some(mut object) = self.load_object(prefix, index).await? else {
            return Ok(());
        };
        if let Some(content) = object.contents.remove(content_id) {
            for key in content.keys.iter().chain(&content.general_keys) {
                self.store.del_by_pattern(key).await?;
            }
        }
        if object.contents.is_empty() {
            self.store
                .del_json(&object.record_key(), &KeyBuilder::tag_index(prefix))
                .await
        } else {
            self.save_object(&object).await
        }
    }

    /// Lists embedding objects under a prefix with pagination.
    pub async fn list_embeddings(
        &self,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<EmbeddingList, RagError> {
        let mut keys = self
            .store
            .keys_by_pattern(&KeyBuilder::raw_docs_pattern(prefix))
            .await?;
        keys.sort();
        let total = keys.len();
        let start = offset.min(total);
        let end = (start + limit).min(total);

        let mut rows = Vec::with_capacity(end - start);
        for key in &keys[start..end] {
            if let Some(value) = self.store.get_json(key).await? {
                if let Ok(object) = serde_json::from_value::<EmbeddingObject>(value) {
                    rows.push(object);
                }
            }
        }
        Ok(EmbeddingList { rows, total })
    }

    /// Resolves retrieved documents back to the index names that own them,
    /// via the tag index over chunk key lists.
    pub async fn rag_indexes(
        &self,
        docs: &[ScoredDocument],
        prefix: &str,
    ) -> Result<Vec<String>, RagError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let queries: Vec<String> = docs
            .iter()
            .filter_map(|doc| doc.metadata_str("id"))
            .map(|id| {
                let escaped = escape_tag_value(id);
                format!("(@GeneralKeys:{{{escaped}}}) | (@Keys:{{{escaped}}})")
            })
            .collect();
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let hits = self
            .store
            .tag_search(&KeyBuilder::tag_index(prefix), &queries.join(" | "), &["$.Index"])
            .await?;
        let mut indexes: Vec<String> = hits
            .into_iter()
            .filter_map(|hit| hit.fields.get("$.Index").cloned())
            .collect();
        indexes.sort();
        indexes.dedup();
        Ok(indexes)
    }

    /// Deletes every record and chunk under a prefix, across all scopes.
    pub async fn clean_embeddings(&self, prefix: &str) -> Result<usize, RagError> {
        let mut removed = 0;
        for pattern in [
            KeyBuilder::raw_docs_pattern(prefix),
            format!("doc:context:{prefix}:*"),
            format!("doc:all:{prefix}:*"),
        ] {
            removed += self.store.del_by_pattern(&pattern).await?;
        }
        Ok(removed)
    }

    async fn load_object(
        &self,
        prefix: &str,
        index: &str,
    ) -> Result<Option<EmbeddingObject>, RagError> {
        let key = KeyBuilder::raw_docs_key(prefix, index);
        match self.store.get_json(&key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RagError::store("stored embedding object is malformed", e)),
            None => Ok(None),
        }
    }

    async fn save_object(&self, object: &EmbeddingObject) -> Result<(), RagError> {
        let tag_index = KeyBuilder::tag_index(&object.prefix);
        self.store
            .create_tag_index(&tag_index, &raw_docs_index_prefix(&object.prefix))
            .await?;
        let key = object.record_key();
        // Overwrite-then-write: some stores reject in-place JSON updates.
        self.store.del_json(&key, &tag_index).await?;
        let value = serde_json::to_value(object)
            .map_err(|e| RagError::Internal(format!("record serialization failed: {e}")))?;
        self.store.put_json(&key, &value).await
    }
}

fn raw_docs_index_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        "rawDocs:".to_string()
    } else {
        format!("rawDocs:{prefix}:")
    }
}

/// Escapes tag-expression metacharacters in a chunk key.
fn escape_tag_value(value: &str) -> String {
    value.replace('-', "\\-").replace(':', "\\:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragweave_test_utils::{MemoryStore, MockEmbedder, MockLlm};

    fn indexer_with(store: Arc<MemoryStore>) -> Indexer {
        Indexer::new(
            store,
            Arc::new(MockEmbedder::new()),
            Some(Arc::new(MockLlm::new())),
            ChunkerConfig::default(),
        )
    }

    fn content(id: &str, text: &str) -> EmbeddingContent {
        EmbeddingContent {
            id: id.to_string(),
            text: text.to_string(),
            title: "Launch note".to_string(),
            source: "unit-test".to_string(),
            ..EmbeddingContent::default()
        }
    }

    fn request(prefix: &str) -> IndexRequest {
        IndexRequest {
            prefix: prefix.to_string(),
            language: Some("en".to_string()),
            ..IndexRequest::default()
        }
    }

    #[tokio::test]
    async fn embed_content_writes_both_scopes() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());

        let object = indexer
            .embed_content(
                "semmapas",
                content("c1", "Our project has been launched since 2023 in Portugal."),
                &request("Company"),
            )
            .await
            .unwrap();

        let stored = &object.contents["c1"];
        assert_eq!(stored.keys.len(), 1);
        assert_eq!(stored.general_keys.len(), 1);
        assert!(stored.keys[0].starts_with("doc:context:Company:semmapas:en:"));
        assert!(stored.general_keys[0].starts_with("doc:all:Company:en:"));
        assert!(store.contains_key(&stored.keys[0]));
        assert!(store.contains_key(&stored.general_keys[0]));
        assert!(store.contains_key("rawDocs:Company:semmapas"));
    }

    #[tokio::test]
    async fn limit_global_skips_cross_index_scope() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let mut req = request("Company");
        req.limit_global = true;

        let object = indexer
            .embed_content("semmapas", content("c1", "three token text here"), &req)
            .await
            .unwrap();

        let stored = &object.contents["c1"];
        assert!(!stored.keys.is_empty());
        assert!(stored.general_keys.is_empty());
    }

    #[tokio::test]
    async fn reingesting_replaces_prior_chunks() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let req = request("Company");

        let first = indexer
            .embed_content("semmapas", content("c1", "original text about the launch"), &req)
            .await
            .unwrap();
        let old_keys = first.contents["c1"].keys.clone();
        let old_general = first.contents["c1"].general_keys.clone();

        let second = indexer
            .embed_content("semmapas", content("c1", "replacement text about the launch"), &req)
            .await
            .unwrap();
        let stored = &second.contents["c1"];

        for key in old_keys.iter().chain(&old_general) {
            assert!(!store.contains_key(key), "stale chunk survived: {key}");
        }
        for key in stored.keys.iter().chain(&stored.general_keys) {
            assert!(store.contains_key(key), "new chunk missing: {key}");
        }
        assert_eq!(second.contents.len(), 1);
    }

    #[tokio::test]
    async fn generated_id_when_caller_leaves_it_empty() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store);

        let object = indexer
            .embed_content("idx", content("", "some text worth indexing"), &request("P"))
            .await
            .unwrap();
        let id = object.contents.keys().next().unwrap();
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn remove_embedding_purges_everything() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let req = request("Company");

        let object = indexer
            .embed_content("semmapas", content("c1", "text that will be removed"), &req)
            .await
            .unwrap();
        let keys: Vec<String> = object.contents["c1"]
            .keys
            .iter()
            .chain(&object.contents["c1"].general_keys)
            .cloned()
            .collect();

        indexer.remove_embedding("Company", "semmapas").await.unwrap();

        for key in keys {
            assert!(!store.contains_key(&key));
        }
        assert!(!store.contains_key("rawDocs:Company:semmapas"));
    }

    #[tokio::test]
    async fn remove_single_content_keeps_siblings() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let req = request("Company");

        indexer
            .embed_content("idx", content("a", "first content body text"), &req)
            .await
            .unwrap();
        indexer
            .embed_content("idx", content("b", "second content body text"), &req)
            .await
            .unwrap();

        indexer
            .remove_embedding_content("Company", "idx", "a")
            .await
            .unwrap();

        let list = indexer.list_embeddings("Company", 0, 10).await.unwrap();
        assert_eq!(list.total, 1);
        let object = &list.rows[0];
        assert!(!object.contents.contains_key("a"));
        assert!(object.contents.contains_key("b"));

        // Removing the last content drops the record itself.
        indexer
            .remove_embedding_content("Company", "idx", "b")
            .await
            .unwrap();
        assert!(!store.contains_key("rawDocs:Company:idx"));
    }

    #[tokio::test]
    async fn list_embeddings_paginates() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store);
        let req = request("P");

        for name in ["idx-a", "idx-b", "idx-c"] {
            indexer
                .embed_content(name, content("c", "body text for listing"), &req)
                .await
                .unwrap();
        }

        let page = indexer.list_embeddings("P", 0, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.rows.len(), 2);

        let tail = indexer.list_embeddings("P", 2, 2).await.unwrap();
        assert_eq!(tail.rows.len(), 1);

        let past_end = indexer.list_embeddings("P", 10, 2).await.unwrap();
        assert!(past_end.rows.is_empty());
        assert_eq!(past_end.total, 3);
    }

    #[tokio::test]
    async fn rag_indexes_resolves_owning_index() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let req = request("P");

        let object = indexer
            .embed_content("semmapas", content("c1", "searchable body text"), &req)
            .await
            .unwrap();
        let chunk_key = object.contents["c1"].keys[0].clone();

        let doc = ScoredDocument {
            page_content: "searchable body text".into(),
            score: 0.9,
            metadata: [(
                "id".to_string(),
                serde_json::Value::String(chunk_key),
            )]
            .into_iter()
            .collect(),
        };
        let indexes = indexer.rag_indexes(&[doc], "P").await.unwrap();
        assert_eq!(indexes, vec!["semmapas"]);

        assert!(indexer.rag_indexes(&[], "P").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clean_embeddings_sweeps_prefix() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let req = request("P");

        indexer
            .embed_content("idx", content("c1", "body text to sweep away"), &req)
            .await
            .unwrap();

        let removed = indexer.clean_embeddings("P").await.unwrap();
        assert!(removed >= 3, "record + two chunk scopes, got {removed}");
        assert!(!store.contains_key("rawDocs:P:idx"));
    }

    #[tokio::test]
    async fn empty_text_produces_no_keys_but_saves_record() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store);

        let object = indexer
            .embed_content("idx", content("c1", ""), &request("P"))
            .await
            .unwrap();
        assert!(object.contents["c1"].keys.is_empty());
    }

    #[test]
    fn tag_value_escaping() {
        assert_eq!(escape_tag_value("doc:a-b"), "doc\\:a\\-b");
    }

    #[test]
    fn record_serde_uses_stored_field_names() {
        let object = EmbeddingObject {
            prefix: "P".into(),
            index: "idx".into(),
            contents: HashMap::from([(
                "c1".to_string(),
                EmbeddingContent {
                    id: "c1".into(),
                    keys: vec!["doc:k".into()],
                    ..EmbeddingContent::default()
                },
            )]),
        };
        let value = serde_json::to_value(&object).unwrap();
        assert!(value.get("EmbeddingPrefix").is_some());
        assert!(value.get("Contents").unwrap().get("c1").unwrap().get("Keys").is_some());
    }
}
