// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constructor registry for provider adapters.
//!
//! Callers register a factory per provider name and capability; the runtime
//! resolves names to boxed trait objects and never inspects concrete types.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RagError;
use crate::traits::{EmbeddingProvider, LlmProvider, VisionProvider};

/// Connection settings handed to provider factories.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// API endpoint of the provider service.
    pub api_url: String,
    /// Model identifier to use.
    pub model: String,
    /// Authentication token, when the provider requires one.
    pub api_token: Option<String>,
}

type LlmFactory =
    Box<dyn Fn(&ProviderSettings) -> Result<Arc<dyn LlmProvider>, RagError> + Send + Sync>;
type EmbeddingFactory =
    Box<dyn Fn(&ProviderSettings) -> Result<Arc<dyn EmbeddingProvider>, RagError> + Send + Sync>;
type VisionFactory =
    Box<dyn Fn(&ProviderSettings) -> Result<Arc<dyn VisionProvider>, RagError> + Send + Sync>;

/// Registry of provider constructors, keyed by name per capability.
#[derive(Default)]
pub struct ProviderRegistry {
    llm: HashMap<String, LlmFactory>,
    embedding: HashMap<String, EmbeddingFactory>,
    vision: HashMap<String, VisionFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_llm<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderSettings) -> Result<Arc<dyn LlmProvider>, RagError> + Send + Sync + 'static,
    {
        self.llm.insert(name.into(), Box::new(factory));
    }

    pub fn register_embedding<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderSettings) -> Result<Arc<dyn EmbeddingProvider>, RagError>
            + Send
            + Sync
            + 'static,
    {
        self.embedding.insert(name.into(), Box::new(factory));
    }

    pub fn register_vision<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderSettings) -> Result<Arc<dyn VisionProvider>, RagError>
            + Send
            + Sync
            + 'static,
    {
        self.vision.insert(name.into(), Box::new(factory));
    }

    pub fn build_llm(
        &self,
        name: &str,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn LlmProvider>, RagError> {
        let factory = self
            .llm
            .get(name)
            .ok_or_else(|| RagError::MissingConfig(format!("llm provider {name:?}")))?;
        factory(settings)
    }

    pub fn build_embedding(
        &self,
        name: &str,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
        let factory = self
            .embedding
            .get(name)
            .ok_or_else(|| RagError::MissingConfig(format!("embedding provider {name:?}")))?;
        factory(settings)
    }

    pub fn build_vision(
        &self,
        name: &str,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn VisionProvider>, RagError> {
        let factory = self
            .vision
            .get(name)
            .ok_or_else(|| RagError::MissingConfig(format!("vision provider {name:?}")))?;
        factory(settings)
    }
}
