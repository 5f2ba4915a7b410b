// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic mock embedding provider.
//!
//! Embeds text as an L2-normalized bag of hashed tokens. Texts sharing
//! vocabulary land close together under cosine similarity, which is enough
//! for retrieval tests to behave like a real embedder without model weights.

use async_trait::async_trait;

use ragweave_core::error::RagError;
use ragweave_core::traits::EmbeddingProvider;

/// Bag-of-tokens embedder with a fixed dimension.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { dimensions: 64 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = token_hash(token) as usize % self.dimensions;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            // Empty input still needs a valid direction.
            vector[0] = 1.0;
        } else {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a, stable across platforms and runs.
fn token_hash(token: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in token.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
