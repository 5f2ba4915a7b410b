// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion entry points: text, files, and URLs into the index.

use std::path::Path;

use tracing::info;

use ragweave_core::error::RagError;
use ragweave_core::traits::TranscribeConfig;
use ragweave_core::types::ScoredDocument;
use ragweave_index::{EmbeddingContent, EmbeddingList, EmbeddingObject, IndexRequest};

use crate::runtime::Runtime;

impl Runtime {
    /// Ingests a text content into `(prefix, index)`, replacing any prior
    /// content with the same id.
    pub async fn embed_text(
        &self,
        index: &str,
        content: EmbeddingContent,
        request: &IndexRequest,
    ) -> Result<EmbeddingObject, RagError> {
        let object = self.indexer.embed_content(index, content, request).await?;
        info!(index, prefix = %request.prefix, "text embedded");
        Ok(object)
    }

    /// Transcribes a file and ingests the extracted text. The source tag
    /// is the file path.
    pub async fn embed_file(
        &self,
        index: &str,
        title: &str,
        path: &Path,
        mime: Option<&str>,
        transcribe: &TranscribeConfig,
        request: &IndexRequest,
    ) -> Result<EmbeddingObject, RagError> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| RagError::MissingConfig("transcription adapter".into()))?;
        let transcript = transcriber.transcribe_file(path, mime, transcribe).await?;
        let content = EmbeddingContent {
            text: transcript.text,
            title: title.to_string(),
            source: path.display().to_string(),
            ..EmbeddingContent::default()
        };
        self.embed_text(index, content, request).await
    }

    /// Downloads and transcribes a URL, then ingests the extracted text.
    pub async fn embed_url(
        &self,
        index: &str,
        url: &str,
        transcribe: &TranscribeConfig,
        request: &IndexRequest,
    ) -> Result<EmbeddingObject, RagError> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| RagError::MissingConfig("transcription adapter".into()))?;
        let transcript = transcriber.transcribe_url(url, transcribe).await?;
        let content = EmbeddingContent {
            text: transcript.text,
            source: url.to_string(),
            ..EmbeddingContent::default()
        };
        self.embed_text(index, content, request).await
    }

    /// Removes an embedding object and every chunk it owns.
    pub async fn remove_embedding(&self, prefix: &str, index: &str) -> Result<(), RagError> {
        self.indexer.remove_embedding(prefix, index).await
    }

    /// Removes one content from an embedding object.
    pub async fn remove_embedding_content(
        &self,
        prefix: &str,
        index: &str,
        content_id: &str,
    ) -> Result<(), RagError> {
        self.indexer
            .remove_embedding_content(prefix, index, content_id)
            .await
    }

    /// Lists embedding objects under a prefix.
    pub async fn list_embeddings(
        &self,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<EmbeddingList, RagError> {
        self.indexer.list_embeddings(prefix, offset, limit).await
    }

    /// Resolves retrieved documents to the index names that own them.
    pub async fn rag_indexes(
        &self,
        docs: &[ScoredDocument],
        prefix: &str,
    ) -> Result<Vec<String>, RagError> {
        self.indexer.rag_indexes(docs, prefix).await
    }

    /// Deletes every record and chunk under a prefix.
    pub async fn clean_embeddings(&self, prefix: &str) -> Result<usize, RagError> {
        let removed = self.indexer.clean_embeddings(prefix).await?;
        info!(prefix, removed, "embeddings cleaned");
        Ok(removed)
    }
}
