// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime configuration.
//!
//! Everything is explicit and set at construction; the environment is read
//! once during [`Runtime::init`](crate::Runtime::init), and only for fields
//! the caller left unset (`RAGWEAVE_STORE_HOST`, `RAGWEAVE_STORE_PASSWORD`).

use std::sync::Arc;

use ragweave_core::traits::{
    DocumentStore, EmbeddingProvider, LlmProvider, Transcriber, VisionProvider,
};
use ragweave_index::ChunkerConfig;
use ragweave_memory::PersistentMemoryConfig;

/// Environment variable consulted when no store is configured.
pub const STORE_HOST_ENV: &str = "RAGWEAVE_STORE_HOST";
/// Environment variable consulted for the store password.
pub const STORE_PASSWORD_ENV: &str = "RAGWEAVE_STORE_PASSWORD";

/// Configuration of a [`Runtime`](crate::Runtime).
///
/// Zero-valued numeric fields and empty strings mean "use the default";
/// [`Runtime::init`](crate::Runtime::init) fills them in.
#[derive(Clone, Default)]
pub struct RuntimeConfig {
    /// LLM provider. Required.
    pub llm: Option<Arc<dyn LlmProvider>>,
    /// Embedding provider. Required.
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    /// Vision provider for image description. Optional.
    pub vision: Option<Arc<dyn VisionProvider>>,
    /// Document store. When unset, `init` connects to the host named by
    /// `RAGWEAVE_STORE_HOST`.
    pub store: Option<Arc<dyn DocumentStore>>,
    /// Transcription adapter for file and URL ingestion. Optional.
    pub transcriber: Option<Arc<dyn Transcriber>>,

    /// Persona prepended as a system message to every prompt.
    pub character_traits: String,
    /// Sampling temperature. Default 0.01.
    pub temperature: f64,
    /// Nucleus sampling threshold. Default 0.01.
    pub top_p: f64,
    /// Minimum similarity for retrieval hits. Default 0.75.
    pub score_threshold: f32,
    /// Retrieved rows per query. Default 5.
    pub rag_row_count: usize,
    /// Let the model answer without retrieval context.
    pub allow_hallucinate: bool,
    /// Language retried when the scoped search comes back empty.
    pub fallback_language: String,
    /// The refusal sentence the model rephrases for out-of-scope queries.
    pub not_related_answer: String,
    /// Message used when retrieval is empty and refusal is configured off.
    pub no_rag_error_message: String,
    /// Reply language when detection is disabled. Default "English".
    pub answer_language: String,
    /// Detect the query language once per session via the LLM.
    pub language_detection_enabled: bool,
    /// Run the content-safety classifier before answering.
    pub safety_check_enabled: bool,

    /// Chunking window settings.
    pub chunking: ChunkerConfig,
    /// TTL of ephemeral session memory, in minutes. Default 300.
    pub ephemeral_ttl_minutes: u64,
    /// Persistent memory settings.
    pub memory: PersistentMemoryConfig,
}

impl RuntimeConfig {
    /// Fills zero values with the documented defaults.
    pub(crate) fn apply_defaults(&mut self) {
        if self.temperature == 0.0 {
            self.temperature = 0.01;
        }
        if self.top_p == 0.0 {
            self.top_p = 0.01;
        }
        if self.score_threshold == 0.0 {
            self.score_threshold = 0.75;
        }
        if self.rag_row_count == 0 {
            self.rag_row_count = 5;
        }
        if self.answer_language.is_empty() {
            self.answer_language = "English".to_string();
        }
        if self.no_rag_error_message.is_empty() {
            self.no_rag_error_message = "You have to say sadly I don't have any data.".to_string();
        }
        if self.not_related_answer.is_empty() {
            self.not_related_answer =
                "I can't find any answer regarding your question.".to_string();
        }
        if self.ephemeral_ttl_minutes == 0 {
            self.ephemeral_ttl_minutes = 300;
        }
        // Memory retrieval inherits the runtime threshold unless tuned.
        if self.memory.search_threshold == 0.75 {
            self.memory.search_threshold = self.score_threshold;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_zero_values() {
        let mut config = RuntimeConfig::default();
        config.apply_defaults();
        assert_eq!(config.temperature, 0.01);
        assert_eq!(config.top_p, 0.01);
        assert_eq!(config.score_threshold, 0.75);
        assert_eq!(config.rag_row_count, 5);
        assert_eq!(config.answer_language, "English");
        assert_eq!(
            config.not_related_answer,
            "I can't find any answer regarding your question."
        );
        assert_eq!(config.ephemeral_ttl_minutes, 300);
    }

    #[test]
    fn caller_values_survive_defaulting() {
        let mut config = RuntimeConfig {
            temperature: 0.5,
            score_threshold: 0.3,
            rag_row_count: 10,
            answer_language: "German".into(),
            ..RuntimeConfig::default()
        };
        config.apply_defaults();
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.score_threshold, 0.3);
        assert_eq!(config.memory.search_threshold, 0.3);
        assert_eq!(config.rag_row_count, 10);
        assert_eq!(config.answer_language, "German");
    }
}
