// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The query orchestrator.
//!
//! `Runtime::ask` drives one request end to end: safety gate, language
//! resolution, memory load, retrieval with language fallback, prompt
//! composition, streamed generation through the sentinel interceptors, the
//! tool-call loop, memory write-back, and reference extraction.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use ragweave_core::error::RagError;
use ragweave_core::keys::KeyBuilder;
use ragweave_core::types::{
    ChatMessage, ChatRequest, ChatRole, MessagePart, ScoredDocument, TokenReport, TokenUsage,
    ToolResult,
};
use ragweave_memory::MemoryTurn;

use crate::language::{notify_language, resolve_language};
use crate::options::AskOptions;
use crate::prompt::{self, LanguageDirective, PromptInputs};
use crate::runtime::Runtime;
use crate::safety::SafetyVerdict;
use crate::stream::{consume_stream, parse_references, StreamOutcome};

/// Named orchestration checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskAction {
    Start,
    VectorSearchStart,
    PromptGenerationStart,
    CallingTools,
    SendingRequest,
    FirstChunkReceived,
    Finished,
}

impl std::fmt::Display for AskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AskAction::Start => "Start",
            AskAction::VectorSearchStart => "Vector Search Start",
            AskAction::PromptGenerationStart => "Prompt Generation Start",
            AskAction::CallingTools => "Calling tools",
            AskAction::SendingRequest => "Sending Request to LLM",
            AskAction::FirstChunkReceived => "First Chunk Received",
            AskAction::Finished => "Finished",
        };
        f.write_str(name)
    }
}

/// One recorded checkpoint.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub action: AskAction,
    pub at: chrono::DateTime<chrono::Utc>,
    /// Time since the request entered the orchestrator.
    pub elapsed: Duration,
}

impl ActionRecord {
    fn new(action: AskAction, started: Instant) -> Self {
        Self {
            action,
            at: chrono::Utc::now(),
            elapsed: started.elapsed(),
        }
    }
}

/// Everything one `ask` call produced.
#[derive(Default)]
pub struct AskResult {
    /// The messages sent to the model.
    pub prompt: Vec<ChatMessage>,
    /// The response text as forwarded to the caller (sentinels handled).
    pub response: String,
    /// Retrieved context documents.
    pub rag_docs: Vec<ScoredDocument>,
    /// Session memory turns that informed this request.
    pub memory: Vec<MemoryTurn>,
    /// Checkpoints hit while serving the request.
    pub actions: Vec<ActionRecord>,
    /// The persistent-memory conversation summary, when one existed.
    pub memory_summary: String,
    pub token_report: TokenReport,
    /// The model refused (leading `@`), the safety gate fired, or the
    /// stream failed.
    pub failed_to_respond: bool,
    /// Content ids the model cited after the reference sentinel.
    pub llm_references: Vec<String>,
    /// Error that aborted the stream mid-response, when one did; the
    /// partial response is kept in `response`.
    pub stream_error: Option<String>,
    /// Verdict of the safety classifier, when it ran.
    pub safety: Option<SafetyVerdict>,
}

impl AskResult {
    fn record(&mut self, action: AskAction, started: Instant, options: &AskOptions) {
        let record = ActionRecord::new(action, started);
        if let Some(callback) = &options.action_callback {
            callback(&record);
        }
        self.actions.push(record);
    }
}

impl Runtime {
    /// Answers a query with retrieval-augmented generation.
    ///
    /// A stream aborted by the caller's sink does not error: the partial
    /// response is returned with `failed_to_respond` set and the abort
    /// reason in `stream_error`.
    pub async fn ask(&self, query: &str, options: AskOptions) -> Result<AskResult, RagError> {
        let started = Instant::now();
        let mut opts = options;
        if opts.index.is_empty() {
            opts.search_all = true;
        }
        let mut result = AskResult::default();
        result.record(AskAction::Start, started, &opts);

        // Safety gate: on an unsafe verdict the model is never invoked.
        if self.config.safety_check_enabled && !opts.ignore_safety_check {
            let verdict = self
                .is_query_safe(query, opts.debug)
                .await?;
            result.token_report.safety_check = verdict.usage;
            let safe = verdict.safe;
            result.safety = Some(verdict);
            if !safe {
                warn!("query rejected by safety classifier");
                result.failed_to_respond = true;
                result.response = self.config.not_related_answer.clone();
                result.record(AskAction::Finished, started, &opts);
                return Ok(result);
            }
        }

        // Session memory feeding the retrieval key and the prompt.
        let mut memory_context = String::new();
        let mut memory_summary = String::new();
        let mut retrieval_memory = String::new();
        let mut ephemeral_turns: Vec<MemoryTurn> = Vec::new();
        if !opts.session_id.is_empty() {
            if opts.persistent_memory {
                let readout = self.persistent.get_memory(&opts.session_id, query).await?;
                memory_context = readout.context;
                memory_summary = readout.record.summary.clone();
                if let Some(last) = &readout.last_turn {
                    retrieval_memory = last.question.clone();
                }
                result.memory = readout.record.questions;
            } else if let Some(turns) = self.ephemeral.get_memory(&opts.session_id) {
                for turn in &turns {
                    retrieval_memory.push('\n');
                    retrieval_memory.push_str(&turn.question);
                }
                ephemeral_turns = turns.clone();
                result.memory = turns;
            }
        }
        result.memory_summary = memory_summary.clone();

        // Exact prompts bypass retrieval, composition, and memory.
        if !opts.exact_prompt.is_empty() {
            let mut messages = Vec::new();
            if opts.force_language {
                let (directive, usage) = self.language_directive(&opts, query).await;
                result.token_report.language_detection = usage;
                if directive.detect_instruction.is_empty() && !directive.language.is_empty() {
                    messages.push(ChatMessage::text(
                        ChatRole::System,
                        format!("Reply in {}", directive.language),
                    ));
                }
            }
            messages.push(ChatMessage::text(ChatRole::Human, opts.exact_prompt.clone()));
            result.prompt = messages.clone();
            let outcome = self.stream_generation(messages, &opts, &mut result, started).await?;
            finish(&mut result, outcome, &opts, started);
            return Ok(result);
        }

        result.record(AskAction::VectorSearchStart, started, &opts);
        let allow_hallucinate = self.config.allow_hallucinate || opts.allow_hallucinate;

        // Retrieval scope: per-index or global, language-suffixed unless the
        // caller forced the language.
        let mut language = opts.language.clone().filter(|l| !l.is_empty());
        if !opts.search_all && language.is_none() && !self.config.fallback_language.is_empty() {
            language = Some(self.config.fallback_language.clone());
        }
        let scope_language = if opts.force_language {
            None
        } else {
            language.as_deref()
        };
        let prefix = if opts.search_all {
            KeyBuilder::global_prefix(&opts.prefix, scope_language)
        } else {
            KeyBuilder::scoped_prefix(&opts.prefix, &opts.index, scope_language)
        };
        let fallback_prefix = (!self.config.fallback_language.is_empty()
            && scope_language != Some(self.config.fallback_language.as_str()))
        .then(|| {
            let fallback = Some(self.config.fallback_language.as_str());
            if opts.search_all {
                KeyBuilder::global_prefix(&opts.prefix, fallback)
            } else {
                KeyBuilder::scoped_prefix(&opts.prefix, &opts.index, fallback)
            }
        });

        let mut retrieval_query = query.to_string();
        if !retrieval_memory.is_empty() {
            retrieval_query.push('\n');
            retrieval_query.push_str(&retrieval_memory);
        }

        let docs = match self
            .retriever
            .search_with_fallback(
                opts.search_mode,
                &prefix,
                fallback_prefix.as_deref(),
                &retrieval_query,
                self.config.rag_row_count,
                self.config.score_threshold,
                opts.hybrid,
            )
            .await
        {
            Ok(docs) => docs,
            Err(err) if allow_hallucinate => {
                warn!(error = %err, "retrieval failed; continuing without context");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        let has_rag = !docs.is_empty() || !opts.extra_context.is_empty();
        debug!(docs = docs.len(), has_rag, "retrieval complete");

        result.record(AskAction::PromptGenerationStart, started, &opts);

        let (directive, language_usage) = self.language_directive(&opts, query).await;
        result.token_report.language_detection = language_usage;
        if let Some(sink) = &opts.event_sink {
            if !opts.session_id.is_empty() {
                if let Some(cached) = self.sessions.language(&opts.session_id) {
                    notify_language(sink.clone(), opts.session_id.clone(), cached);
                }
            }
        }

        if !has_rag && !allow_hallucinate && self.config.no_rag_error_message.is_empty() {
            return Err(RagError::NoContext);
        }

        let character = if opts.character.is_empty() {
            "helpful"
        } else {
            &opts.character
        };
        let (system_prompt, kind) = prompt::compose(&PromptInputs {
            character,
            docs: &docs,
            extra_context: &opts.extra_context,
            memory_context: &memory_context,
            memory_summary: &memory_summary,
            language: &directive,
            not_related_answer: &self.config.not_related_answer,
            query,
            include_date: opts.include_date,
            rag_references: opts.rag_references,
            force_long: opts.force_long,
            context_cleanup: opts.context_cleanup,
            allow_hallucinate,
            max_words: opts.max_words,
        });
        debug!(kind = ?kind, "prompt composed");

        let mut messages = Vec::new();
        if !self.config.character_traits.is_empty() {
            messages.push(ChatMessage::text(
                ChatRole::System,
                self.config.character_traits.clone(),
            ));
        }
        messages.push(ChatMessage::text(ChatRole::System, system_prompt));
        messages.push(ChatMessage::text(ChatRole::Human, query.to_string()));

        // Tool loop: one non-streamed round with tools attached, handlers
        // executed, tool results appended, then the main generation runs
        // over the extended message list.
        if let Some(tools) = opts.tools.clone().filter(|tools| !tools.is_empty()) {
            result.record(AskAction::CallingTools, started, &opts);
            let tool_request = ChatRequest {
                messages: vec![ChatMessage::text(ChatRole::Human, query.to_string())],
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                max_tokens: opts.max_tokens,
                model: opts.custom_model.clone(),
                tools: tools.specs().to_vec(),
            };
            let tool_response = self.llm.complete(tool_request).await?;

            let mut assistant_parts = Vec::new();
            if !tool_response.content.is_empty() {
                assistant_parts.push(MessagePart::Text(tool_response.content.clone()));
            }
            for call in &tool_response.tool_calls {
                assistant_parts.push(MessagePart::ToolCall(call.clone()));
            }
            if !assistant_parts.is_empty() {
                messages.push(ChatMessage {
                    role: ChatRole::Ai,
                    parts: assistant_parts,
                });
            }

            for call in &tool_response.tool_calls {
                let Some(handler) = tools.handler(&call.name) else {
                    continue;
                };
                let arguments: serde_json::Value =
                    serde_json::from_str(&call.arguments).map_err(|e| {
                        RagError::Provider {
                            message: format!("malformed tool arguments for {}: {e}", call.name),
                            source: Some(Box::new(e)),
                        }
                    })?;
                let output = handler(arguments)?;
                messages.push(ChatMessage {
                    role: ChatRole::Tool,
                    parts: vec![MessagePart::ToolResult(ToolResult {
                        tool_call_id: call.id.clone(),
                        name: call.name.clone(),
                        content: output,
                    })],
                });
            }
        }

        result.prompt = messages.clone();
        let outcome = self.stream_generation(messages, &opts, &mut result, started).await?;

        // Memory write-back: only with context (or hallucination allowed),
        // a session, and a non-refused, non-aborted response.
        let memory_allowed = (has_rag || allow_hallucinate)
            && !opts.session_id.is_empty()
            && !outcome.failed_to_respond
            && !outcome.stopped
            && outcome.error.is_none();
        if memory_allowed {
            let turn = MemoryTurn::new(query, outcome.text.clone());
            if opts.persistent_memory {
                if opts.async_memory_summarization {
                    self.persistent
                        .add_memory_detached(opts.session_id.clone(), turn);
                } else {
                    let usage = self.persistent.add_memory(&opts.session_id, turn).await?;
                    result.token_report.memory_summarization = usage;
                }
            } else {
                ephemeral_turns.push(turn);
                self.ephemeral.add_memory(&opts.session_id, ephemeral_turns);
            }
        }

        result.rag_docs = docs;
        finish(&mut result, outcome, &opts, started);
        Ok(result)
    }

    /// Resolves the response-language directive for this request.
    async fn language_directive(
        &self,
        opts: &AskOptions,
        query: &str,
    ) -> (LanguageDirective, TokenUsage) {
        if opts.force_language {
            if let Some(language) = opts.language.clone().filter(|l| !l.is_empty()) {
                return (
                    LanguageDirective {
                        detect_instruction: String::new(),
                        language,
                    },
                    TokenUsage::default(),
                );
            }
        }
        resolve_language(
            self.llm.as_ref(),
            &self.sessions,
            self.config.language_detection_enabled,
            &self.config.answer_language,
            &opts.session_id,
            query,
        )
        .await
    }

    /// Streams one generation through the interceptor pipeline and folds
    /// the outcome into the result.
    async fn stream_generation(
        &self,
        messages: Vec<ChatMessage>,
        opts: &AskOptions,
        result: &mut AskResult,
        started: Instant,
    ) -> Result<StreamOutcome, RagError> {
        result.record(AskAction::SendingRequest, started, opts);
        let request = ChatRequest {
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: opts.max_tokens,
            model: opts.custom_model.clone(),
            tools: Vec::new(),
        };
        let stream = self.llm.stream(request).await?;

        let callback = opts.action_callback.clone();
        let mut first_chunk: Option<ActionRecord> = None;
        let outcome = consume_stream(
            stream,
            opts.streaming.as_deref(),
            || {
                let record = ActionRecord::new(AskAction::FirstChunkReceived, started);
                if let Some(callback) = &callback {
                    callback(&record);
                }
                first_chunk.get_or_insert(record);
            },
        )
        .await;
        if let Some(record) = first_chunk {
            result.actions.push(record);
        }

        result.response = outcome.text.clone();
        result.failed_to_respond |= outcome.failed_to_respond;
        result.token_report.completion = outcome.usage.unwrap_or(TokenUsage {
            input_tokens: 0,
            output_tokens: outcome.token_count,
        });
        if let Some(err) = &outcome.error {
            result.failed_to_respond = true;
            result.stream_error = Some(err.to_string());
        }
        Ok(outcome)
    }
}

fn finish(result: &mut AskResult, outcome: StreamOutcome, opts: &AskOptions, started: Instant) {
    if opts.rag_references {
        result.llm_references = parse_references(&outcome.references_raw);
    }
    result.record(AskAction::Finished, started, opts);
}
