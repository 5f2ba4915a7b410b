// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of [`DocumentStore`].
//!
//! Emulates the store contract closely enough for invariant tests: JSON
//! records, chunk documents under key prefixes, idempotent index creation,
//! cosine vector search, token-frequency text scoring, tag lookups over
//! record key lists, glob pattern deletion, and lazy TTL expiry.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;

use ragweave_core::error::RagError;
use ragweave_core::traits::{ChunkRecord, DocumentStore, TagHit, TextHit};
use ragweave_core::types::ScoredDocument;

#[derive(Debug, Clone)]
struct StoredChunk {
    index: String,
    content: String,
    embedding: Vec<f32>,
    metadata: HashMap<String, String>,
}

#[derive(Default)]
struct Shared {
    json: HashMap<String, serde_json::Value>,
    chunks: HashMap<String, StoredChunk>,
    vector_indexes: HashMap<String, usize>,
    text_indexes: HashMap<String, String>,
    tag_indexes: HashMap<String, String>,
    deadlines: HashMap<String, Instant>,
}

impl Shared {
    fn purge_expired(&mut self) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.deadlines.remove(&key);
            self.json.remove(&key);
            self.chunks.remove(&key);
        }
    }
}

/// In-memory document store for tests.
#[derive(Default)]
pub struct MemoryStore {
    shared: Mutex<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All live keys (records and chunks), for assertions.
    pub fn live_keys(&self) -> Vec<String> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        let mut keys: Vec<String> = shared
            .json
            .keys()
            .chain(shared.chunks.keys())
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// True when the key resolves to a live record or chunk.
    pub fn contains_key(&self, key: &str) -> bool {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        shared.json.contains_key(key) || shared.chunks.contains_key(key)
    }

    /// Remaining TTL of a key, when one was set.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let shared = self.shared.lock().expect("store lock");
        shared
            .deadlines
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Backdates a key's TTL so the next operation treats it as expired.
    pub fn force_expire(&self, key: &str) {
        let mut shared = self.shared.lock().expect("store lock");
        shared
            .deadlines
            .insert(key.to_string(), Instant::now() - Duration::from_secs(1));
    }
}

fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).expect("glob pattern")
}

fn token_patterns() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@content:\*([^*]+)\*").expect("static pattern"))
}

fn tag_values() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("static pattern"))
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), RagError> {
        Ok(())
    }

    async fn put_json(&self, key: &str, value: &serde_json::Value) -> Result<(), RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        shared.json.insert(key.to_string(), value.clone());
        shared.deadlines.remove(key);
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        Ok(shared.json.get(key).cloned())
    }

    async fn del_json(&self, key: &str, _tag_index: &str) -> Result<(), RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.json.remove(key);
        shared.deadlines.remove(key);
        Ok(())
    }

    async fn del_by_pattern(&self, pattern: &str) -> Result<usize, RagError> {
        let matcher = glob_to_regex(pattern);
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        let matching: Vec<String> = shared
            .json
            .keys()
            .chain(shared.chunks.keys())
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect();
        for key in &matching {
            shared.json.remove(key);
            shared.chunks.remove(key);
            shared.deadlines.remove(key);
        }
        Ok(matching.len())
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, RagError> {
        let matcher = glob_to_regex(pattern);
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        let mut keys: Vec<String> = shared
            .json
            .keys()
            .chain(shared.chunks.keys())
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        if shared.json.contains_key(key) || shared.chunks.contains_key(key) {
            shared.deadlines.insert(key.to_string(), Instant::now() + ttl);
        }
        Ok(())
    }

    async fn create_tag_index(&self, name: &str, key_prefix: &str) -> Result<(), RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared
            .tag_indexes
            .entry(name.to_string())
            .or_insert_with(|| key_prefix.to_string());
        Ok(())
    }

    async fn create_text_index(&self, name: &str, key_prefix: &str) -> Result<(), RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared
            .text_indexes
            .entry(name.to_string())
            .or_insert_with(|| key_prefix.to_string());
        Ok(())
    }

    async fn create_vector_index(&self, name: &str, dimensions: usize) -> Result<(), RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared
            .vector_indexes
            .entry(name.to_string())
            .or_insert(dimensions);
        Ok(())
    }

    async fn add_chunks(
        &self,
        index: &str,
        key_prefix: &str,
        chunks: Vec<ChunkRecord>,
    ) -> Result<Vec<String>, RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();

        let dimensions = match chunks.first() {
            Some(chunk) => chunk.embedding.len(),
            None => return Ok(Vec::new()),
        };
        let expected = *shared
            .vector_indexes
            .entry(index.to_string())
            .or_insert(dimensions);
        let mut keys = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.embedding.len() != expected {
                return Err(RagError::store_msg(format!(
                    "embedding dimension {} does not match index dimension {expected}",
                    chunk.embedding.len()
                )));
            }
            let key = format!("{key_prefix}{}", uuid::Uuid::new_v4().simple());
            shared.chunks.insert(
                key.clone(),
                StoredChunk {
                    index: index.to_string(),
                    content: chunk.content,
                    embedding: chunk.embedding,
                    metadata: chunk.metadata,
                },
            );
            keys.push(key);
        }
        Ok(keys)
    }

    async fn vector_search(
        &self,
        index: &str,
        query: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        if !shared.vector_indexes.contains_key(index) {
            return Err(RagError::IndexMissing(index.to_string()));
        }

        let mut hits: Vec<ScoredDocument> = shared
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.index == index)
            .filter_map(|(key, chunk)| {
                let score = cosine(query, &chunk.embedding);
                if score < min_score {
                    return None;
                }
                let mut metadata: HashMap<String, serde_json::Value> = chunk
                    .metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect();
                metadata.insert("id".into(), serde_json::Value::String(key.clone()));
                Some(ScoredDocument {
                    page_content: chunk.content.clone(),
                    score,
                    metadata,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn text_search(
        &self,
        index: &str,
        expression: &str,
        limit: usize,
    ) -> Result<Vec<TextHit>, RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        let key_prefix = shared
            .text_indexes
            .get(index)
            .cloned()
            .ok_or_else(|| RagError::IndexMissing(index.to_string()))?;

        let tokens: Vec<String> = token_patterns()
            .captures_iter(expression)
            .map(|cap| cap[1].replace('\\', "").to_lowercase())
            .collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<TextHit> = shared
            .chunks
            .iter()
            .filter(|(key, _)| key.starts_with(&key_prefix))
            .filter_map(|(key, chunk)| {
                let haystack = chunk.content.to_lowercase();
                let score: f64 = tokens
                    .iter()
                    .map(|token| haystack.matches(token.as_str()).count() as f64)
                    .sum();
                if score == 0.0 {
                    return None;
                }
                let mut attributes = chunk.metadata.clone();
                attributes.insert("content".into(), chunk.content.clone());
                Some(TextHit {
                    key: key.clone(),
                    score,
                    attributes,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn tag_search(
        &self,
        index: &str,
        expression: &str,
        return_fields: &[&str],
    ) -> Result<Vec<TagHit>, RagError> {
        let mut shared = self.shared.lock().expect("store lock");
        shared.purge_expired();
        let key_prefix = shared
            .tag_indexes
            .get(index)
            .cloned()
            .ok_or_else(|| RagError::IndexMissing(index.to_string()))?;

        let values: Vec<String> = tag_values()
            .captures_iter(expression)
            .map(|cap| cap[1].replace('\\', ""))
            .collect();
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for (key, record) in shared.json.iter() {
            if !key.starts_with(&key_prefix) {
                continue;
            }
            let contents = match record.get("Contents").and_then(|c| c.as_object()) {
                Some(contents) => contents,
                None => continue,
            };
            let mut tags: Vec<&str> = Vec::new();
            for content in contents.values() {
                for list in ["Keys", "GeneralKeys"] {
                    if let Some(keys) = content.get(list).and_then(|k| k.as_array()) {
                        tags.extend(keys.iter().filter_map(|k| k.as_str()));
                    }
                }
            }
            if !values.iter().any(|v| tags.contains(&v.as_str())) {
                continue;
            }
            let mut fields = HashMap::new();
            for field in return_fields {
                let name = field.trim_start_matches("$.");
                if let Some(value) = record.get(name).and_then(|v| v.as_str()) {
                    fields.insert((*field).to_string(), value.to_string());
                }
            }
            hits.push(TagHit {
                key: key.clone(),
                fields,
            });
        }
        Ok(hits)
    }
}
