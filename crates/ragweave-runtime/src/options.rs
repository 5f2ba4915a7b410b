// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request options for [`Runtime::ask`](crate::Runtime::ask).
//!
//! Options are assembled through a builder and read immutably by the
//! orchestrator; nothing mutates them mid-request.

use std::collections::HashMap;
use std::sync::Arc;

use ragweave_core::error::RagError;
use ragweave_core::traits::{SessionEventSink, TokenSink};
use ragweave_core::types::{SearchMode, ToolSpec};
use ragweave_retrieval::HybridConfig;

use crate::ask::ActionRecord;

/// Callback fired at named orchestration checkpoints.
pub type ActionCallback = Arc<dyn Fn(&ActionRecord) + Send + Sync>;

/// Executes one tool call; receives the parsed JSON arguments.
pub type ToolHandler = Arc<dyn Fn(serde_json::Value) -> Result<String, RagError> + Send + Sync>;

/// Tools offered to the model, with their handlers.
#[derive(Clone, Default)]
pub struct ToolSet {
    specs: Vec<ToolSpec>,
    handlers: HashMap<String, ToolHandler>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool and its handler.
    pub fn register(&mut self, spec: ToolSpec, handler: ToolHandler) {
        self.handlers.insert(spec.name.clone(), handler);
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn handler(&self, name: &str) -> Option<&ToolHandler> {
        self.handlers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Fully-built options for one `ask` call.
#[derive(Clone, Default)]
pub struct AskOptions {
    pub streaming: Option<Arc<dyn TokenSink>>,
    pub action_callback: Option<ActionCallback>,
    pub language: Option<String>,
    pub session_id: String,
    pub prefix: String,
    pub index: String,
    /// Search the cross-index (global) scope instead of one index.
    pub search_all: bool,
    pub extra_context: String,
    /// Bypass retrieval and send this prompt verbatim.
    pub exact_prompt: String,
    pub context_cleanup: bool,
    pub persistent_memory: bool,
    /// Per-request persona, rendered into the prompt template.
    pub character: String,
    pub max_tokens: Option<u32>,
    pub event_sink: Option<Arc<dyn SessionEventSink>>,
    /// Treat `language` as authoritative; skips detection and the
    /// language-scoped index suffix.
    pub force_language: bool,
    pub allow_hallucinate: bool,
    pub force_long: bool,
    pub include_date: bool,
    pub rag_references: bool,
    pub tools: Option<ToolSet>,
    pub search_mode: SearchMode,
    pub hybrid: Option<HybridConfig>,
    pub debug: bool,
    pub max_words: Option<usize>,
    pub custom_model: Option<String>,
    pub async_memory_summarization: bool,
    pub ignore_safety_check: bool,
}

impl AskOptions {
    pub fn builder() -> AskOptionsBuilder {
        AskOptionsBuilder::default()
    }
}

/// Builder for [`AskOptions`].
#[derive(Default)]
pub struct AskOptionsBuilder {
    options: AskOptions,
}

impl AskOptionsBuilder {
    pub fn streaming(mut self, sink: Arc<dyn TokenSink>) -> Self {
        self.options.streaming = Some(sink);
        self
    }

    pub fn action_callback(mut self, callback: ActionCallback) -> Self {
        self.options.action_callback = Some(callback);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.options.language = Some(language.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.options.session_id = session_id.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.prefix = prefix.into();
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.options.index = index.into();
        self
    }

    /// Searches the cross-index scope, optionally pinned to a language.
    pub fn search_all(mut self, language: impl Into<String>) -> Self {
        self.options.search_all = true;
        let language = language.into();
        if !language.is_empty() {
            self.options.language = Some(language);
        }
        self
    }

    pub fn extra_context(mut self, context: impl Into<String>) -> Self {
        self.options.extra_context = context.into();
        self
    }

    pub fn exact_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.exact_prompt = prompt.into();
        self
    }

    pub fn context_cleanup(mut self, cleanup: bool) -> Self {
        self.options.context_cleanup = cleanup;
        self
    }

    pub fn persistent_memory(mut self, persistent: bool) -> Self {
        self.options.persistent_memory = persistent;
        self
    }

    pub fn character(mut self, character: impl Into<String>) -> Self {
        self.options.character = character.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn SessionEventSink>) -> Self {
        self.options.event_sink = Some(sink);
        self
    }

    pub fn force_language(mut self, force: bool) -> Self {
        self.options.force_language = force;
        self
    }

    pub fn allow_hallucinate(mut self, allow: bool) -> Self {
        self.options.allow_hallucinate = allow;
        self
    }

    pub fn force_long(mut self, force_long: bool) -> Self {
        self.options.force_long = force_long;
        self
    }

    pub fn include_date(mut self, include: bool) -> Self {
        self.options.include_date = include;
        self
    }

    pub fn rag_references(mut self, references: bool) -> Self {
        self.options.rag_references = references;
        self
    }

    pub fn tools(mut self, tools: ToolSet) -> Self {
        self.options.tools = Some(tools);
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.options.search_mode = mode;
        self
    }

    pub fn hybrid_config(mut self, config: HybridConfig) -> Self {
        self.options.hybrid = Some(config);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    pub fn max_words(mut self, max_words: usize) -> Self {
        self.options.max_words = Some(max_words);
        self
    }

    pub fn custom_model(mut self, model: impl Into<String>) -> Self {
        self.options.custom_model = Some(model.into());
        self
    }

    pub fn async_memory_summarization(mut self, asynchronous: bool) -> Self {
        self.options.async_memory_summarization = asynchronous;
        self
    }

    pub fn ignore_safety_check(mut self, ignore: bool) -> Self {
        self.options.ignore_safety_check = ignore;
        self
    }

    pub fn build(self) -> AskOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragweave_core::types::Flow;

    #[test]
    fn builder_sets_fields() {
        let options = AskOptions::builder()
            .session_id("s1")
            .prefix("Company")
            .index("semmapas")
            .allow_hallucinate(true)
            .search_mode(SearchMode::Hybrid)
            .max_words(50)
            .build();
        assert_eq!(options.session_id, "s1");
        assert_eq!(options.prefix, "Company");
        assert_eq!(options.index, "semmapas");
        assert!(options.allow_hallucinate);
        assert_eq!(options.search_mode, SearchMode::Hybrid);
        assert_eq!(options.max_words, Some(50));
        assert!(!options.search_all);
    }

    #[test]
    fn search_all_pins_language() {
        let options = AskOptions::builder().search_all("en").build();
        assert!(options.search_all);
        assert_eq!(options.language.as_deref(), Some("en"));

        let options = AskOptions::builder().search_all("").build();
        assert!(options.search_all);
        assert!(options.language.is_none());
    }

    #[test]
    fn toolset_registration_and_lookup() {
        let mut tools = ToolSet::new();
        assert!(tools.is_empty());
        tools.register(
            ToolSpec {
                name: "lookup".into(),
                description: "find things".into(),
                parameters: serde_json::json!({"type": "object"}),
            },
            Arc::new(|args: serde_json::Value| -> Result<String, RagError> {
                Ok(format!("got {args}"))
            }),
        );
        assert!(!tools.is_empty());
        assert!(tools.handler("lookup").is_some());
        assert!(tools.handler("other").is_none());
        assert_eq!(tools.specs().len(), 1);
    }

    #[test]
    fn streaming_sink_is_stored() {
        let sink: Arc<dyn TokenSink> =
            Arc::new(|_: &str| -> Result<Flow, RagError> { Ok(Flow::Continue) });
        let options = AskOptions::builder().streaming(sink).build();
        assert!(options.streaming.is_some());
    }
}
