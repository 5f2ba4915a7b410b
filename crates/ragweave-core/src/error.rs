// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the ragweave runtime.

use thiserror::Error;

/// The primary error type used across all ragweave adapter traits and core
/// operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required configuration field was never set (store host, provider, ...).
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// The document store rejected an operation or is unreachable.
    #[error("store error: {message}")]
    Store {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A JSON record was not found in the store.
    #[error("store key not found: {0}")]
    StoreNotFound(String),

    /// A search index does not exist. Retrieval treats this as an empty
    /// result set rather than a failure.
    #[error("index missing: {0}")]
    IndexMissing(String),

    /// The embedding provider failed or is not configured.
    #[error("embedder error: {message}")]
    Embedder {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The LLM provider failed (API failure, model not found, malformed reply).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// File or URL transcription failed.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// The transcription adapter cannot handle the given MIME type.
    #[error("unsupported mime type: {0}")]
    UnsupportedMime(String),

    /// Text chunking produced no usable output.
    #[error("chunking error: {0}")]
    Chunking(String),

    /// A request option carried an invalid value (negative weight, ...).
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// The safety classifier flagged the query. Non-fatal: the orchestrator
    /// short-circuits with a safe refusal.
    #[error("query rejected by safety classifier")]
    SafetyViolation,

    /// Retrieval produced nothing, hallucination is disallowed, and no
    /// refusal message is configured to fall back on.
    #[error("no retrieval context and hallucination is not allowed")]
    NoContext,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    /// Shorthand for a store error wrapping a driver-level failure.
    pub fn store<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RagError::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a store error with no underlying source.
    pub fn store_msg(message: impl Into<String>) -> Self {
        RagError::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a provider error with no underlying source.
    pub fn provider_msg(message: impl Into<String>) -> Self {
        RagError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// True when the error only signals a missing search index, which
    /// retrieval callers treat as "no results".
    pub fn is_index_missing(&self) -> bool {
        matches!(self, RagError::IndexMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render_messages() {
        let err = RagError::MissingConfig("store host".into());
        assert_eq!(err.to_string(), "missing configuration: store host");

        let err = RagError::store_msg("connection refused");
        assert!(err.to_string().contains("connection refused"));

        let err = RagError::IndexMissing("context:p:idx:aillm_vector_idx".into());
        assert!(err.is_index_missing());
        assert!(!RagError::NoContext.is_index_missing());
    }

    #[test]
    fn store_error_preserves_source() {
        let io = std::io::Error::other("boom");
        let err = RagError::store("write failed", io);
        match err {
            RagError::Store { source, .. } => assert!(source.is_some()),
            other => panic!("expected Store, got {other:?}"),
        }
    }
}
