// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent session memory.
//!
//! Each turn is embedded into the session's own vector index with a TTL,
//! and the full turn list lives in a JSON record next to it. From the
//! second turn on, the model maintains a short conversation summary. Writes
//! for the same session are serialized through a per-session lock so turn
//! order and summary refresh stay deterministic under concurrent requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use ragweave_core::error::RagError;
use ragweave_core::keys::KeyBuilder;
use ragweave_core::traits::{DocumentStore, EmbeddingProvider, LlmProvider};
use ragweave_core::types::{ChatMessage, ChatRequest, ChatRole, ScoredDocument, TokenUsage};
use ragweave_index::{IndexScope, Indexer};

use crate::types::{MemoryRecord, MemoryTurn};

const SUMMARY_INSTRUCTION: &str = "Summarize the following conversation in a few short sentences. \
Keep every concrete fact: names, places, dates, and numbers. Reply with the summary only.\n\n";

/// Settings for the persistent tier.
#[derive(Debug, Clone)]
pub struct PersistentMemoryConfig {
    /// Prefix of memory keys and indexes.
    pub memory_prefix: String,
    /// TTL applied to every turn chunk and the session record.
    pub ttl: Duration,
    /// Similarity threshold for history retrieval.
    pub search_threshold: f32,
    /// How many prior turns relevance retrieval may add to the context.
    pub history_item_count: usize,
}

impl Default for PersistentMemoryConfig {
    fn default() -> Self {
        Self {
            memory_prefix: "Memory".to_string(),
            ttl: Duration::from_secs(30 * 60),
            search_threshold: 0.75,
            history_item_count: 5,
        }
    }
}

/// What a memory read hands the orchestrator.
#[derive(Debug, Default)]
pub struct MemoryReadout {
    /// The most recent turn, when any exists.
    pub last_turn: Option<MemoryTurn>,
    /// The full session record (turn list + summary).
    pub record: MemoryRecord,
    /// Composed context string for the prompt.
    pub context: String,
    /// Turns matched by relevance retrieval.
    pub matched: Vec<ScoredDocument>,
}

/// Store-backed session memory with LLM summaries.
pub struct PersistentMemory {
    store: Arc<dyn DocumentStore>,
    indexer: Arc<Indexer>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    config: PersistentMemoryConfig,
    session_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PersistentMemory {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        indexer: Arc<Indexer>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        config: PersistentMemoryConfig,
    ) -> Self {
        Self {
            store,
            indexer,
            embedder,
            llm,
            config,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PersistentMemoryConfig {
        &self.config
    }

    fn session_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.session_locks.lock().expect("lock map");
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn record_key(&self, session_id: &str) -> String {
        KeyBuilder::raw_memory_key(&self.config.memory_prefix, session_id)
    }

    fn retrieval_prefix(&self, session_id: &str) -> String {
        KeyBuilder::memory_prefix(&self.config.memory_prefix, session_id)
    }

    /// Appends a turn: embeds it into the session index with a TTL, appends
    /// it to the record, and refreshes the summary once two or more turns
    /// exist. Returns the summarization token usage.
    pub async fn add_memory(
        &self,
        session_id: &str,
        mut turn: MemoryTurn,
    ) -> Result<TokenUsage, RagError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let retrieval_prefix = self.retrieval_prefix(session_id);
        let rendered = format!("{}\n", turn.rendered());
        let outcome = self
            .indexer
            .embed_text(
                IndexScope::Verbatim(&retrieval_prefix),
                "",
                &rendered,
                "",
                None,
                &[],
                true,
                false,
            )
            .await?;
        for key in &outcome.keys {
            self.store.expire(key, self.config.ttl).await?;
        }
        turn.keys = outcome.keys;

        let record_key = self.record_key(session_id);
        let mut record = self.load_record(&record_key).await?;
        record.questions.push(turn);

        let mut usage = TokenUsage::default();
        if record.questions.len() >= 2 {
            match self.summarize(&record).await {
                Ok((summary, summary_usage)) => {
                    record.summary = summary;
                    usage = summary_usage;
                }
                Err(err) => {
                    // The turn is already stored; a failed refresh only
                    // leaves the previous summary in place.
                    warn!(session_id, error = %err, "memory summarization failed");
                }
            }
        }

        let value = serde_json::to_value(&record)
            .map_err(|e| RagError::Internal(format!("memory record serialization: {e}")))?;
        self.store.put_json(&record_key, &value).await?;
        self.store.expire(&record_key, self.config.ttl).await?;

        debug!(
            session_id,
            turns = record.questions.len(),
            "memory turn appended"
        );
        Ok(usage)
    }

    /// Fire-and-forget variant used when the caller asked for asynchronous
    /// summarization; errors are logged, never surfaced.
    pub fn add_memory_detached(self: &Arc<Self>, session_id: String, turn: MemoryTurn) {
        let memory = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = memory.add_memory(&session_id, turn).await {
                warn!(session_id, error = %err, "detached memory write failed");
            }
        });
    }

    /// Reads the session memory relevant to `query`.
    ///
    /// The context is the summary (when present), then up to
    /// `history_item_count` relevance-matched prior turns, then the most
    /// recent turn verbatim.
    pub async fn get_memory(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<MemoryReadout, RagError> {
        let record = self.load_record(&self.record_key(session_id)).await?;
        let mut readout = MemoryReadout {
            record: record.clone(),
            ..MemoryReadout::default()
        };
        let Some(last_turn) = record.questions.last() else {
            return Ok(readout);
        };

        let mut context = String::new();
        if !record.summary.is_empty() {
            context.push_str(&record.summary);
            context.push('\n');
        }

        if record.questions.len() >= 2 {
            let mut vectors = self.embedder.embed_batch(&[query.to_string()]).await?;
            let embedding = vectors.pop().ok_or_else(|| RagError::Embedder {
                message: "embedder returned no vector for the memory query".into(),
                source: None,
            })?;
            let index = KeyBuilder::vector_index(&self.retrieval_prefix(session_id));
            let matched = match self
                .store
                .vector_search(
                    &index,
                    &embedding,
                    self.config.history_item_count,
                    self.config.search_threshold,
                )
                .await
            {
                Ok(docs) => docs,
                Err(err) if err.is_index_missing() => Vec::new(),
                Err(err) => return Err(err),
            };
            for doc in &matched {
                context.push_str(&doc.page_content);
            }
            readout.matched = matched;
        }

        context.push_str(&last_turn.rendered());
        readout.last_turn = Some(last_turn.clone());
        readout.context = context;
        Ok(readout)
    }

    /// Deletes a session: every turn's chunks, then the record itself.
    pub async fn delete_memory(&self, session_id: &str) -> Result<(), RagError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let record_key = self.record_key(session_id);
        let record = self.load_record(&record_key).await?;
        for turn in &record.questions {
            for key in &turn.keys {
                self.store.del_by_pattern(key).await?;
            }
        }
        self.store.del_json(&record_key, "").await?;
        debug!(session_id, "session memory deleted");
        Ok(())
    }

    async fn load_record(&self, record_key: &str) -> Result<MemoryRecord, RagError> {
        match self.store.get_json(record_key).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| RagError::store("memory record is malformed", e)),
            None => Ok(MemoryRecord::default()),
        }
    }

    async fn summarize(&self, record: &MemoryRecord) -> Result<(String, TokenUsage), RagError> {
        let mut history = String::new();
        for turn in &record.questions {
            history.push_str(&turn.rendered());
        }
        let request = ChatRequest {
            messages: vec![ChatMessage::text(
                ChatRole::Human,
                format!("{SUMMARY_INSTRUCTION}{history}"),
            )],
            temperature: 0.0,
            top_p: 0.0,
            ..ChatRequest::default()
        };
        let response = self.llm.complete(request).await?;
        Ok((response.content.trim().to_string(), response.usage))
    }
}
