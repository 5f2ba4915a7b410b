// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcription adapter contract.
//!
//! Concrete extraction backends (PDF, HTML, OCR services) live outside this
//! workspace; the runtime only depends on their output shape.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RagError;

/// Per-call transcription settings.
#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    /// Hard deadline for the extraction call.
    pub timeout: Duration,
    /// Run the aggressive cleanup pass (HTML removal) on the output.
    pub aggressive_cleanup: bool,
    /// Refuse documents with more pages than this.
    pub max_pages: u32,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            aggressive_cleanup: false,
            max_pages: 1000,
        }
    }
}

/// Cleaned text extracted from a document.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// Page count when the source format has pages, `-1` otherwise.
    pub page_count: i32,
}

/// Converts files and URLs into cleaned text for ingestion.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe_file(
        &self,
        path: &Path,
        mime: Option<&str>,
        config: &TranscribeConfig,
    ) -> Result<Transcript, RagError>;

    async fn transcribe_url(
        &self,
        url: &str,
        config: &TranscribeConfig,
    ) -> Result<Transcript, RagError>;
}
