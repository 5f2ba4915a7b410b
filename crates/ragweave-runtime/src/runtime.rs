// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`Runtime`] facade.

use std::sync::Arc;

use tracing::info;

use ragweave_core::error::RagError;
use ragweave_core::traits::{
    DocumentStore, EmbeddingProvider, LlmProvider, Transcriber, VisionProvider,
};
use ragweave_index::Indexer;
use ragweave_memory::{MemoryManager, PersistentMemory};
use ragweave_redis::{RedisConfig, RedisStore};
use ragweave_retrieval::Retriever;

use crate::config::{RuntimeConfig, STORE_HOST_ENV, STORE_PASSWORD_ENV};
use crate::language::SessionState;
use crate::safety::{self, SafetyVerdict};

/// A configured RAG runtime.
///
/// Construct with [`Runtime::init`]; every operation then borrows `&self`,
/// so one runtime serves many concurrent requests.
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) llm: Arc<dyn LlmProvider>,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) vision: Option<Arc<dyn VisionProvider>>,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) transcriber: Option<Arc<dyn Transcriber>>,
    pub(crate) indexer: Arc<Indexer>,
    pub(crate) retriever: Retriever,
    pub(crate) ephemeral: MemoryManager,
    pub(crate) persistent: Arc<PersistentMemory>,
    pub(crate) sessions: SessionState,
}

impl Runtime {
    /// Validates the configuration, applies defaults, connects the store
    /// (from the environment when none was supplied), and starts the
    /// ephemeral memory sweeper.
    pub async fn init(mut config: RuntimeConfig) -> Result<Self, RagError> {
        config.apply_defaults();

        let llm = config
            .llm
            .clone()
            .ok_or_else(|| RagError::MissingConfig("llm provider".into()))?;
        let embedder = config
            .embedder
            .clone()
            .ok_or_else(|| RagError::MissingConfig("embedding provider".into()))?;

        let store: Arc<dyn DocumentStore> = match config.store.clone() {
            Some(store) => store,
            None => {
                let host = std::env::var(STORE_HOST_ENV).unwrap_or_default();
                if host.is_empty() {
                    return Err(RagError::MissingConfig("store host".into()));
                }
                let password = std::env::var(STORE_PASSWORD_ENV).ok().filter(|p| !p.is_empty());
                Arc::new(
                    RedisStore::connect(&RedisConfig {
                        host,
                        password,
                        ..RedisConfig::default()
                    })
                    .await?,
                )
            }
        };
        store.ping().await?;

        let indexer = Arc::new(Indexer::new(
            store.clone(),
            embedder.clone(),
            Some(llm.clone()),
            config.chunking,
        ));
        let retriever = Retriever::new(store.clone(), embedder.clone());
        let ephemeral = MemoryManager::new(config.ephemeral_ttl_minutes);
        let persistent = Arc::new(PersistentMemory::new(
            store.clone(),
            indexer.clone(),
            embedder.clone(),
            llm.clone(),
            config.memory.clone(),
        ));

        info!(
            score_threshold = config.score_threshold,
            rag_row_count = config.rag_row_count,
            "runtime initialized"
        );

        Ok(Self {
            vision: config.vision.clone(),
            transcriber: config.transcriber.clone(),
            llm,
            embedder,
            store,
            indexer,
            retriever,
            ephemeral,
            persistent,
            sessions: SessionState::new(),
            config,
        })
    }

    /// Classifies a query with the content-safety classifier.
    pub async fn is_query_safe(&self, query: &str, debug: bool) -> Result<SafetyVerdict, RagError> {
        safety::classify(self.llm.as_ref(), query, debug).await
    }

    /// Deletes a session's memory in both tiers and forgets its cached
    /// language.
    pub async fn delete_memory(&self, session_id: &str) -> Result<(), RagError> {
        self.persistent.delete_memory(session_id).await?;
        self.ephemeral.delete_memory(session_id);
        self.sessions.clear(session_id);
        Ok(())
    }

    /// The ephemeral memory manager, for direct inspection.
    pub fn ephemeral_memory(&self) -> &MemoryManager {
        &self.ephemeral
    }

    /// The persistent memory manager.
    pub fn persistent_memory(&self) -> &Arc<PersistentMemory> {
        &self.persistent
    }
}
