// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key and index-name composition.
//!
//! Every key the runtime writes or queries is built here; no other module
//! concatenates key strings by hand. Layout:
//!
//! - scoped vector index: `context:<prefix>:<index>[:<language>]:aillm_vector_idx`
//! - global vector index: `all:<prefix>[:<language>]:aillm_vector_idx`
//! - full-text index: `<retrieval prefix>aillm_text_idx` over chunk keys `doc:<retrieval prefix>*`
//! - tag index: `rawDocsIdx[:<prefix>]` over records `rawDocs:<prefix>:*`
//! - raw record: `rawDocs:<prefix>:<sanitized index>`
//! - session memory: index `<memory prefix>:<session>:aillm_vector_idx`,
//!   record `rawMemory:<memory prefix>:<session>`

use std::sync::OnceLock;

use regex::Regex;

/// Suffix shared by every vector index name.
pub const VECTOR_INDEX_SUFFIX: &str = "aillm_vector_idx";
/// Suffix shared by every full-text index name.
pub const TEXT_INDEX_SUFFIX: &str = "aillm_text_idx";
/// Key prefix under which chunk documents are stored.
pub const DOC_KEY_PREFIX: &str = "doc:";
/// Key prefix for embedding object records.
pub const RAW_DOCS_PREFIX: &str = "rawDocs";
/// Key prefix for persistent memory records.
pub const RAW_MEMORY_PREFIX: &str = "rawMemory";
/// Base name of the tag index over embedding object records.
pub const TAG_INDEX_BASE: &str = "rawDocsIdx";

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9:_-]").expect("static pattern"))
}

/// Sanitizes an arbitrary string into a safe key segment: characters outside
/// `[A-Za-z0-9:_-]` become `_`, runs of `_` collapse, and leading/trailing
/// `_` are trimmed. Idempotent.
pub fn sanitize(input: &str) -> String {
    let replaced = invalid_chars().replace_all(input, "_");
    let mut collapsed = String::with_capacity(replaced.len());
    let mut last_underscore = false;
    for c in replaced.chars() {
        if c == '_' {
            if !last_underscore {
                collapsed.push(c);
            }
            last_underscore = true;
        } else {
            collapsed.push(c);
            last_underscore = false;
        }
    }
    collapsed.trim_matches('_').to_string()
}

/// Composes every key and index name used by the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyBuilder;

impl KeyBuilder {
    /// Retrieval prefix for the per-index scope, ending in `:`.
    pub fn scoped_prefix(prefix: &str, index: &str, language: Option<&str>) -> String {
        let mut out = String::from("context:");
        if !prefix.is_empty() {
            out.push_str(prefix);
            out.push(':');
        }
        if !index.is_empty() {
            out.push_str(index);
            out.push(':');
        }
        if let Some(lang) = language.filter(|l| !l.is_empty()) {
            out.push_str(lang);
            out.push(':');
        }
        out
    }

    /// Retrieval prefix for the cross-index scope, ending in `:`.
    pub fn global_prefix(prefix: &str, language: Option<&str>) -> String {
        let mut out = String::from("all:");
        if !prefix.is_empty() {
            out.push_str(prefix);
            out.push(':');
        }
        if let Some(lang) = language.filter(|l| !l.is_empty()) {
            out.push_str(lang);
            out.push(':');
        }
        out
    }

    /// Retrieval prefix for a session's memory scope, ending in `:`.
    pub fn memory_prefix(memory_prefix: &str, session_id: &str) -> String {
        format!("{memory_prefix}:{session_id}:")
    }

    /// Vector index name for a retrieval prefix.
    pub fn vector_index(retrieval_prefix: &str) -> String {
        format!("{retrieval_prefix}{VECTOR_INDEX_SUFFIX}")
    }

    /// Full-text index name for a retrieval prefix.
    pub fn text_index(retrieval_prefix: &str) -> String {
        format!("{retrieval_prefix}{TEXT_INDEX_SUFFIX}")
    }

    /// Key prefix under which chunks of a retrieval prefix are stored.
    pub fn doc_key_prefix(retrieval_prefix: &str) -> String {
        format!("{DOC_KEY_PREFIX}{retrieval_prefix}")
    }

    /// Record key of the embedding object for `(prefix, index)`.
    pub fn raw_docs_key(prefix: &str, index: &str) -> String {
        let mut out = format!("{RAW_DOCS_PREFIX}:");
        if !prefix.is_empty() {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&sanitize(index));
        out
    }

    /// Glob matching every embedding object record under a prefix.
    pub fn raw_docs_pattern(prefix: &str) -> String {
        if prefix.is_empty() {
            format!("{RAW_DOCS_PREFIX}:*")
        } else {
            format!("{RAW_DOCS_PREFIX}:{prefix}:*")
        }
    }

    /// Name of the tag index over embedding object records.
    pub fn tag_index(prefix: &str) -> String {
        if prefix.is_empty() {
            TAG_INDEX_BASE.to_string()
        } else {
            format!("{TAG_INDEX_BASE}:{prefix}")
        }
    }

    /// Record key of a session's persistent memory.
    pub fn raw_memory_key(memory_prefix: &str, session_id: &str) -> String {
        format!("{RAW_MEMORY_PREFIX}:{memory_prefix}:{session_id}")
    }
}
