// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming interception.
//!
//! Provider chunks run through a small pipeline before they reach the
//! caller's sink: the first non-space character is checked for the `@`
//! refusal sentinel (stripped, and the response marked failed), everything
//! after a `⧉` reference sentinel is diverted into a buffer instead of the
//! sink, and tokens are counted along the way. A sink that returns
//! [`Flow::Stop`] or an error aborts the provider stream; whatever was
//! forwarded so far is kept as the partial response.

use futures::StreamExt;

use ragweave_core::error::RagError;
use ragweave_core::traits::{ChunkStream, TokenSink};
use ragweave_core::types::{Flow, StreamEventType, TokenUsage};

use crate::prompt::{REFERENCE_SENTINEL, REFUSAL_SENTINEL};

/// What stream consumption produced.
#[derive(Default)]
pub struct StreamOutcome {
    /// Forwarded response text (refusal sentinel stripped, references
    /// excluded).
    pub text: String,
    /// Raw bytes diverted after the reference sentinel.
    pub references_raw: String,
    /// Number of content chunks observed.
    pub token_count: u32,
    /// Usage reported by the provider, when it reported any.
    pub usage: Option<TokenUsage>,
    /// The response opened with the refusal sentinel.
    pub failed_to_respond: bool,
    /// The sink asked to stop early.
    pub stopped: bool,
    /// The sink or the provider failed mid-stream.
    pub error: Option<RagError>,
}

enum Phase {
    /// Waiting for the first non-space character.
    AwaitingFirstWord,
    /// Normal forwarding.
    Body,
    /// Diverting everything into the references buffer.
    References,
}

/// Consumes a provider stream through the interceptor pipeline.
///
/// `on_first_chunk` fires once, when the first content chunk arrives.
pub async fn consume_stream(
    mut stream: ChunkStream,
    sink: Option<&dyn TokenSink>,
    mut on_first_chunk: impl FnMut(),
) -> StreamOutcome {
    let mut outcome = StreamOutcome::default();
    let mut phase = Phase::AwaitingFirstWord;
    let mut first_chunk_seen = false;

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(err) => {
                outcome.error = Some(err);
                break;
            }
        };
        match chunk.event {
            StreamEventType::ContentBlockDelta => {}
            StreamEventType::MessageDelta | StreamEventType::MessageStart => {
                if let Some(usage) = chunk.usage {
                    outcome.usage = Some(usage);
                }
                continue;
            }
            StreamEventType::MessageStop => break,
            StreamEventType::Error => {
                outcome.error = Some(RagError::Provider {
                    message: chunk
                        .error
                        .unwrap_or_else(|| "provider stream error".to_string()),
                    source: None,
                });
                break;
            }
        }
        let Some(mut text) = chunk.text else {
            continue;
        };

        outcome.token_count += 1;
        if !first_chunk_seen {
            first_chunk_seen = true;
            on_first_chunk();
        }

        if let Phase::References = phase {
            outcome.references_raw.push_str(&text);
            continue;
        }

        if let Phase::AwaitingFirstWord = phase {
            if text.trim().is_empty() {
                // Still before the first word; forward the whitespace.
            } else {
                if let Some(position) = text.find(|c: char| !c.is_whitespace()) {
                    if text[position..].starts_with(REFUSAL_SENTINEL) {
                        outcome.failed_to_respond = true;
                        let mut stripped = String::with_capacity(text.len());
                        stripped.push_str(&text[..position]);
                        stripped.push_str(&text[position + REFUSAL_SENTINEL.len_utf8()..]);
                        text = stripped;
                    }
                }
                phase = Phase::Body;
            }
        }

        // Everything after the reference sentinel belongs to the trailing
        // references object, never to the caller.
        if let Some(position) = text.find(REFERENCE_SENTINEL) {
            let after = text[position + REFERENCE_SENTINEL.len_utf8()..].to_string();
            text.truncate(position);
            outcome.references_raw.push_str(&after);
            phase = Phase::References;
        }

        if text.is_empty() {
            continue;
        }
        outcome.text.push_str(&text);
        if let Some(sink) = sink {
            match sink.on_chunk(&text) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    outcome.stopped = true;
                    break;
                }
                Err(err) => {
                    outcome.error = Some(err);
                    break;
                }
            }
        }
    }

    outcome
}

/// Parses the diverted references buffer: `{"references": ["id", ...]}`.
pub fn parse_references(raw: &str) -> Vec<String> {
    #[derive(serde::Deserialize)]
    struct References {
        references: Vec<String>,
    }
    serde_json::from_str::<References>(raw.trim())
        .map(|parsed| parsed.references)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use ragweave_core::types::StreamChunk;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn chunk_stream(parts: &[&str]) -> ChunkStream {
        let chunks: Vec<Result<StreamChunk, RagError>> = parts
            .iter()
            .map(|part| Ok(StreamChunk::delta(part.to_string())))
            .chain([Ok(StreamChunk::event(StreamEventType::MessageStop))])
            .collect();
        Box::pin(stream::iter(chunks))
    }

    struct Collector(Mutex<String>);

    impl TokenSink for Collector {
        fn on_chunk(&self, chunk: &str) -> Result<Flow, RagError> {
            self.0.lock().unwrap().push_str(chunk);
            Ok(Flow::Continue)
        }
    }

    #[tokio::test]
    async fn plain_stream_forwards_everything() {
        let sink = Collector(Mutex::new(String::new()));
        let outcome = consume_stream(chunk_stream(&["Hel", "lo"]), Some(&sink), || {}).await;
        assert_eq!(outcome.text, "Hello");
        assert_eq!(sink.0.lock().unwrap().as_str(), "Hello");
        assert!(!outcome.failed_to_respond);
        assert_eq!(outcome.token_count, 2);
    }

    #[tokio::test]
    async fn leading_refusal_sentinel_is_stripped() {
        let sink = Collector(Mutex::new(String::new()));
        let outcome =
            consume_stream(chunk_stream(&["@", "Sorry", ", no."]), Some(&sink), || {}).await;
        assert!(outcome.failed_to_respond);
        assert_eq!(outcome.text, "Sorry, no.");
        assert_eq!(sink.0.lock().unwrap().as_str(), "Sorry, no.");
    }

    #[tokio::test]
    async fn refusal_sentinel_after_leading_spaces() {
        let sink = Collector(Mutex::new(String::new()));
        let outcome = consume_stream(chunk_stream(&[" ", "@No."]), Some(&sink), || {}).await;
        assert!(outcome.failed_to_respond);
        assert_eq!(outcome.text, " No.");
    }

    #[tokio::test]
    async fn at_sign_mid_response_is_not_a_refusal() {
        let sink = Collector(Mutex::new(String::new()));
        let outcome = consume_stream(
            chunk_stream(&["Mail", " me ", "@home"]),
            Some(&sink),
            || {},
        )
        .await;
        assert!(!outcome.failed_to_respond);
        assert_eq!(outcome.text, "Mail me @home");
    }

    #[tokio::test]
    async fn reference_sentinel_diverts_tail() {
        let sink = Collector(Mutex::new(String::new()));
        let outcome = consume_stream(
            chunk_stream(&["Answer.", "⧉", " {\"references\":", "[\"a\",\"b\"]}"]),
            Some(&sink),
            || {},
        )
        .await;
        assert_eq!(outcome.text, "Answer.");
        assert_eq!(sink.0.lock().unwrap().as_str(), "Answer.");
        assert!(!sink.0.lock().unwrap().contains('⧉'));
        assert_eq!(parse_references(&outcome.references_raw), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn sentinel_inside_one_chunk_splits_it() {
        let sink = Collector(Mutex::new(String::new()));
        let outcome = consume_stream(
            chunk_stream(&["Done.⧉ {\"references\":[\"x\"]}"]),
            Some(&sink),
            || {},
        )
        .await;
        assert_eq!(outcome.text, "Done.");
        assert_eq!(parse_references(&outcome.references_raw), vec!["x"]);
    }

    #[tokio::test]
    async fn sink_stop_aborts_stream() {
        let calls = AtomicU32::new(0);
        let sink = move |_: &str| -> Result<Flow, RagError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Flow::Stop)
        };
        let outcome = consume_stream(chunk_stream(&["a", "b", "c"]), Some(&sink), || {}).await;
        assert!(outcome.stopped);
        assert_eq!(outcome.text, "a");
    }

    #[tokio::test]
    async fn sink_error_keeps_partial_text() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_in_sink = seen.clone();
        let sink = move |_: &str| -> Result<Flow, RagError> {
            if seen_in_sink.fetch_add(1, Ordering::SeqCst) >= 1 {
                Err(RagError::Internal("caller gave up".into()))
            } else {
                Ok(Flow::Continue)
            }
        };
        let outcome = consume_stream(chunk_stream(&["ab", "cd", "ef"]), Some(&sink), || {}).await;
        assert!(outcome.error.is_some());
        assert_eq!(outcome.text, "abcd");
    }

    #[tokio::test]
    async fn first_chunk_callback_fires_once() {
        let count = AtomicU32::new(0);
        consume_stream(chunk_stream(&["a", "b"]), None, || {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn usage_captured_from_message_delta() {
        let chunks: Vec<Result<StreamChunk, RagError>> = vec![
            Ok(StreamChunk::delta("hi")),
            Ok(StreamChunk {
                event: StreamEventType::MessageDelta,
                text: None,
                usage: Some(TokenUsage {
                    input_tokens: 7,
                    output_tokens: 2,
                }),
                stop_reason: Some("end_turn".into()),
                error: None,
            }),
            Ok(StreamChunk::event(StreamEventType::MessageStop)),
        ];
        let outcome = consume_stream(Box::pin(stream::iter(chunks)), None, || {}).await;
        assert_eq!(outcome.usage.unwrap().output_tokens, 2);
    }

    #[test]
    fn reference_parsing_tolerates_garbage() {
        assert!(parse_references("not json").is_empty());
        assert!(parse_references("").is_empty());
        assert_eq!(
            parse_references(" {\"references\":[\"one\"]} "),
            vec!["one"]
        );
    }
}
