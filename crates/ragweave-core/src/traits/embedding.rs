// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider capability trait.

use async_trait::async_trait;

use crate::error::RagError;

/// Capability interface for dense-vector embedding providers.
///
/// The embedding dimension is opaque to the core; it only has to match the
/// dimension of the vector index being written to, and a mismatch surfaces
/// as a store error. Implementations are expected to initialize lazily and
/// stay cheap to clone behind an `Arc`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}
