// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-guided semantic chunking.
//!
//! The raw text is pre-split into fixed word-boundary windows, each window
//! is sent to the model with a fixed instruction, and the reply is parsed
//! back into `----CHUNK----` delimited blocks with per-block keyword lists.
//! Blocks whose body cannot be found in the source text are reported as
//! inconsistent but still indexed; the report is diagnostic.

use tracing::warn;

use ragweave_core::error::RagError;
use ragweave_core::traits::LlmProvider;
use ragweave_core::types::{ChatMessage, ChatRequest, ChatRole};

use crate::chunker::{split_windows, token_count, ChunkerConfig, MIN_CHUNK_TOKENS};

/// Literal delimiter the model must emit between blocks.
pub const CHUNK_MARKER: &str = "----CHUNK----";
/// Literal marker introducing each block's keyword list.
pub const KEYWORDS_MARKER: &str = "###keywords:###";

const SPLIT_INSTRUCTION: &str = r#"Split the following text into self-contained semantic chunks.

Rules:
- Copy the text verbatim; never paraphrase, translate, or reorder it.
- Separate chunks with a line containing exactly ----CHUNK----
- After each chunk body, add one line starting with ###keywords:### followed by a comma-separated list of keywords for that chunk.
- Do not add any commentary before, between, or after the chunks.

Text:
"#;

/// One semantic chunk returned by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticChunk {
    pub content: String,
    pub keywords: Vec<String>,
}

/// Result of an LLM-guided split.
#[derive(Debug, Default)]
pub struct LlmChunkOutcome {
    pub chunks: Vec<SemanticChunk>,
    /// Bodies the model emitted that do not appear in the source text.
    pub inconsistent: Vec<String>,
}

/// Splits text by asking the model to segment each fixed window.
pub async fn split_with_llm(
    llm: &dyn LlmProvider,
    text: &str,
    config: &ChunkerConfig,
) -> Result<LlmChunkOutcome, RagError> {
    let mut outcome = LlmChunkOutcome::default();
    for window in split_windows(text, config.chunk_size) {
        let request = ChatRequest {
            messages: vec![ChatMessage::text(
                ChatRole::Human,
                format!("{SPLIT_INSTRUCTION}{window}"),
            )],
            temperature: 0.0,
            top_p: 0.0,
            ..ChatRequest::default()
        };
        let response = llm.complete(request).await?;
        let parsed = parse_blocks(&response.content, text);
        outcome.chunks.extend(parsed.chunks);
        outcome.inconsistent.extend(parsed.inconsistent);
    }
    if outcome.chunks.is_empty() {
        return Err(RagError::Chunking(
            "model returned no usable chunks".into(),
        ));
    }
    if !outcome.inconsistent.is_empty() {
        warn!(
            count = outcome.inconsistent.len(),
            "model emitted chunks not present in the source text"
        );
    }
    Ok(outcome)
}

/// Parses a model reply into chunks, checking each body against the source.
pub fn parse_blocks(reply: &str, source: &str) -> LlmChunkOutcome {
    let mut outcome = LlmChunkOutcome::default();
    for block in reply.split(CHUNK_MARKER) {
        let (body, keywords) = match block.find(KEYWORDS_MARKER) {
            Some(pos) => {
                let keyword_line = block[pos + KEYWORDS_MARKER.len()..]
                    .lines()
                    .next()
                    .unwrap_or("");
                let keywords = keyword_line
                    .split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
                (block[..pos].trim(), keywords)
            }
            None => (block.trim(), Vec::new()),
        };
        if token_count(body) < MIN_CHUNK_TOKENS {
            continue;
        }
        if !source.contains(body) {
            outcome.inconsistent.push(body.to_string());
        }
        outcome.chunks.push(SemanticChunk {
            content: body.to_string(),
            keywords,
        });
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blocks_and_keywords() {
        let source = "Rust is a systems language. Cargo is its build tool.";
        let reply = "Rust is a systems language.\n###keywords:### rust, systems\n----CHUNK----\nCargo is its build tool.\n###keywords:### cargo, build tool\n";
        let outcome = parse_blocks(reply, source);
        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.chunks[0].content, "Rust is a systems language.");
        assert_eq!(outcome.chunks[0].keywords, vec!["rust", "systems"]);
        assert_eq!(outcome.chunks[1].keywords, vec!["cargo", "build tool"]);
        assert!(outcome.inconsistent.is_empty());
    }

    #[test]
    fn short_blocks_are_discarded() {
        let outcome = parse_blocks(
            "too short\n----CHUNK----\nthis one is long enough",
            "this one is long enough",
        );
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.chunks[0].content, "this one is long enough");
    }

    #[test]
    fn rewritten_bodies_are_flagged_but_kept() {
        let source = "The launch happened in Portugal in 2023.";
        let reply = "The launch happened somewhere else entirely.\n###keywords:### launch";
        let outcome = parse_blocks(reply, source);
        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(outcome.inconsistent.len(), 1);
        assert!(outcome.inconsistent[0].contains("somewhere else"));
    }

    #[test]
    fn block_without_keyword_marker_still_parses() {
        let source = "alpha beta gamma delta";
        let outcome = parse_blocks("alpha beta gamma delta", source);
        assert_eq!(outcome.chunks.len(), 1);
        assert!(outcome.chunks[0].keywords.is_empty());
    }

    #[tokio::test]
    async fn split_with_llm_merges_window_results() {
        use ragweave_test_utils::MockLlm;

        let text = "first sentence here. second sentence there.";
        let llm = MockLlm::with_responses([
            "first sentence here.\n###keywords:### first\n----CHUNK----\nsecond sentence there.\n###keywords:### second",
        ]);
        let outcome = split_with_llm(&llm, text, &ChunkerConfig::default())
            .await
            .unwrap();
        assert_eq!(outcome.chunks.len(), 2);
        assert!(outcome.inconsistent.is_empty());
    }

    #[tokio::test]
    async fn empty_model_reply_is_chunking_error() {
        use ragweave_test_utils::MockLlm;

        let llm = MockLlm::with_responses([""]);
        let err = split_with_llm(&llm, "some text to split", &ChunkerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Chunking(_)));
    }
}
