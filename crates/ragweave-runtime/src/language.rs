// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session language detection and caching.
//!
//! The detection LLM runs at most once per session; the result is cached in
//! a session-state service and delivered to any registered event sink from
//! a detached task, so a slow or dropped receiver can never fail the
//! request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use ragweave_core::error::RagError;
use ragweave_core::traits::{LlmProvider, SessionEventSink};
use ragweave_core::types::{ChatMessage, ChatRequest, ChatRole, TokenUsage};

use crate::prompt::LanguageDirective;

/// Process-wide per-session state (currently: the detected language).
#[derive(Default)]
pub struct SessionState {
    languages: Mutex<HashMap<String, String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self, session_id: &str) -> Option<String> {
        self.languages
            .lock()
            .expect("session lock")
            .get(session_id)
            .cloned()
    }

    pub fn set_language(&self, session_id: &str, language: &str) {
        self.languages
            .lock()
            .expect("session lock")
            .insert(session_id.to_string(), language.to_string());
    }

    pub fn clear(&self, session_id: &str) {
        self.languages.lock().expect("session lock").remove(session_id);
    }
}

/// Normalizes detector output to the languages the indexes use.
///
/// `NONE` falls back to English; Portuguese is pinned to the European
/// variant the deployments expect.
pub fn normalize_language(detected: &str) -> String {
    let trimmed = detected.trim().trim_end_matches('.');
    match trimmed.to_lowercase().as_str() {
        "none" | "" => "English".to_string(),
        "portuguese" | "pt" => "European Portuguese (pt-PT)".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Single-shot language classification of a query.
pub async fn detect_language(
    llm: &dyn LlmProvider,
    query: &str,
) -> Result<(String, TokenUsage), RagError> {
    let prompt = format!(
        "What language is \"{query}\" in? Say just it in one word without \".\" and just return \"NONE\" if you can't detect it."
    );
    let request = ChatRequest {
        messages: vec![ChatMessage::text(ChatRole::Human, prompt)],
        temperature: 0.0,
        top_p: 0.0,
        ..ChatRequest::default()
    };
    let response = llm.complete(request).await?;
    Ok((normalize_language(&response.content), response.usage))
}

/// Resolves the language directive for a request.
///
/// Returns the directive plus the tokens spent on detection (zero on a
/// cache hit or when detection is disabled).
pub async fn resolve_language(
    llm: &dyn LlmProvider,
    sessions: &SessionState,
    detection_enabled: bool,
    answer_language: &str,
    session_id: &str,
    query: &str,
) -> (LanguageDirective, TokenUsage) {
    if !detection_enabled {
        return (
            LanguageDirective {
                detect_instruction: String::new(),
                language: answer_language.to_string(),
            },
            TokenUsage::default(),
        );
    }

    if !session_id.is_empty() {
        if let Some(cached) = sessions.language(session_id) {
            return (
                LanguageDirective {
                    detect_instruction: String::new(),
                    language: cached,
                },
                TokenUsage::default(),
            );
        }
    }

    match detect_language(llm, query).await {
        Ok((language, usage)) => {
            if !session_id.is_empty() {
                sessions.set_language(session_id, &language);
            }
            debug!(session_id, language, "query language detected");
            (
                LanguageDirective {
                    detect_instruction: String::new(),
                    language,
                },
                usage,
            )
        }
        Err(err) => {
            warn!(error = %err, "language detection failed; delegating to the model");
            (
                LanguageDirective {
                    detect_instruction: format!(
                        "{{language}} = detect_language(\"{query}\") without mentioning in response. "
                    ),
                    language: "{language}".to_string(),
                },
                TokenUsage::default(),
            )
        }
    }
}

/// [`SessionEventSink`] adapter that forwards detected languages into a
/// channel. Sends are best-effort; a dropped receiver is ignored.
pub struct ChannelEventSink {
    sender: tokio::sync::mpsc::UnboundedSender<String>,
}

impl ChannelEventSink {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl SessionEventSink for ChannelEventSink {
    fn on_language_detected(&self, _session_id: &str, language: &str) {
        let _ = self.sender.send(language.to_string());
    }
}

/// Delivers the detected language to the sink from a detached task.
/// Best-effort: a panicking sink is caught and logged, never propagated.
pub fn notify_language(
    sink: Arc<dyn SessionEventSink>,
    session_id: String,
    language: String,
) {
    tokio::spawn(async move {
        let delivery = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sink.on_language_detected(&session_id, &language);
        }));
        if delivery.is_err() {
            warn!(session_id, "language event sink panicked; notification dropped");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn normalization_aliases() {
        assert_eq!(normalize_language("NONE"), "English");
        assert_eq!(normalize_language("Portuguese"), "European Portuguese (pt-PT)");
        assert_eq!(normalize_language("pt"), "European Portuguese (pt-PT)");
        assert_eq!(normalize_language("French."), "French");
        assert_eq!(normalize_language(" German "), "German");
    }

    #[test]
    fn session_state_roundtrip() {
        let state = SessionState::new();
        assert!(state.language("s1").is_none());
        state.set_language("s1", "French");
        assert_eq!(state.language("s1").as_deref(), Some("French"));
        state.clear("s1");
        assert!(state.language("s1").is_none());
    }

    struct PanickySink;

    impl SessionEventSink for PanickySink {
        fn on_language_detected(&self, _session_id: &str, _language: &str) {
            panic!("receiver is gone");
        }
    }

    struct CountingSink(AtomicUsize);

    impl SessionEventSink for CountingSink {
        fn on_language_detected(&self, _session_id: &str, _language: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn notify_survives_panicking_sink() {
        notify_language(Arc::new(PanickySink), "s1".into(), "French".into());
        // Give the detached task a chance to run; the test passes if the
        // panic never propagates.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn notify_delivers_to_sink() {
        let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
        notify_language(sink.clone(), "s1".into(), "French".into());
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channel_sink_forwards_language() {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let sink = ChannelEventSink::new(sender);
        sink.on_language_detected("s1", "French");
        assert_eq!(receiver.recv().await.as_deref(), Some("French"));
    }

    #[tokio::test]
    async fn channel_sink_ignores_dropped_receiver() {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel::<String>();
        drop(receiver);
        let sink = ChannelEventSink::new(sender);
        // Must not panic or error.
        sink.on_language_detected("s1", "French");
    }
}
