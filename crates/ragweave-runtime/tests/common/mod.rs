// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared harness for runtime integration tests: a full runtime wired to
//! the in-memory store and mock providers.

use std::sync::{Arc, Mutex};

use ragweave_core::types::Flow;
use ragweave_core::TokenSink;
use ragweave_runtime::{EmbeddingContent, IndexRequest, Runtime, RuntimeConfig};
use ragweave_test_utils::{MemoryStore, MockEmbedder, MockLlm};

pub struct Harness {
    pub runtime: Runtime,
    pub store: Arc<MemoryStore>,
    pub llm: Arc<MockLlm>,
}

/// Builds a runtime over mocks, with a recall-friendly score threshold.
pub async fn harness() -> Harness {
    harness_with(|_| {}).await
}

pub async fn harness_with(tune: impl FnOnce(&mut RuntimeConfig)) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let llm = Arc::new(MockLlm::new());
    let mut config = RuntimeConfig {
        llm: Some(llm.clone()),
        embedder: Some(Arc::new(MockEmbedder::new())),
        store: Some(store.clone()),
        score_threshold: 0.05,
        ..RuntimeConfig::default()
    };
    tune(&mut config);
    let runtime = Runtime::init(config).await.expect("runtime init");
    Harness {
        runtime,
        store,
        llm,
    }
}

impl Harness {
    /// Ingests a text under `(prefix, index)` with a fixed content id.
    pub async fn ingest(&self, prefix: &str, index: &str, id: &str, text: &str) {
        let content = EmbeddingContent {
            id: id.to_string(),
            text: text.to_string(),
            ..EmbeddingContent::default()
        };
        let request = IndexRequest {
            prefix: prefix.to_string(),
            ..IndexRequest::default()
        };
        self.runtime
            .embed_text(index, content, &request)
            .await
            .expect("ingest");
    }
}

/// A token sink that collects everything forwarded to the caller.
#[derive(Default)]
pub struct CollectingSink(pub Mutex<String>);

impl CollectingSink {
    pub fn contents(&self) -> String {
        self.0.lock().unwrap().clone()
    }
}

impl TokenSink for CollectingSink {
    fn on_chunk(&self, chunk: &str) -> Result<Flow, ragweave_runtime::RagError> {
        self.0.lock().unwrap().push_str(chunk);
        Ok(Flow::Continue)
    }
}
