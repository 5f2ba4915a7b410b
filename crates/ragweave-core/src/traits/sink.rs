// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing sinks: streamed tokens and session events.

use crate::error::RagError;
use crate::types::Flow;

/// Push sink for streamed response text.
///
/// The orchestrator calls `on_chunk` for every forwarded token. Returning
/// [`Flow::Stop`] or an error aborts the provider stream; the partial
/// response captured so far is still returned to the caller.
pub trait TokenSink: Send + Sync {
    fn on_chunk(&self, chunk: &str) -> Result<Flow, RagError>;
}

impl<F> TokenSink for F
where
    F: Fn(&str) -> Result<Flow, RagError> + Send + Sync,
{
    fn on_chunk(&self, chunk: &str) -> Result<Flow, RagError> {
        self(chunk)
    }
}

/// Receiver for per-session notifications from the orchestrator.
///
/// Delivery is best-effort and never fails the request: the orchestrator
/// invokes sinks from a detached task and discards any panic.
pub trait SessionEventSink: Send + Sync {
    fn on_language_detected(&self, session_id: &str, language: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn closures_implement_token_sink() {
        let seen = Arc::new(AtomicUsize::new(0));
        let inner = seen.clone();
        let sink = move |chunk: &str| -> Result<Flow, RagError> {
            inner.fetch_add(chunk.len(), Ordering::SeqCst);
            Ok(Flow::Continue)
        };
        assert_eq!(sink.on_chunk("abc").unwrap(), Flow::Continue);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn sink_can_request_stop() {
        let sink = |_: &str| -> Result<Flow, RagError> { Ok(Flow::Stop) };
        assert_eq!(sink.on_chunk("x").unwrap(), Flow::Stop);
    }
}
