// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`RedisStore`] adapter.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Value;
use tracing::{debug, warn};

use ragweave_core::error::RagError;
use ragweave_core::keys::VECTOR_INDEX_SUFFIX;
use ragweave_core::traits::{ChunkRecord, DocumentStore, TagHit, TextHit};
use ragweave_core::types::ScoredDocument;

/// Connection settings for the store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port` of the Redis server.
    pub host: String,
    /// Password, when the server requires AUTH.
    pub password: Option<String>,
    /// Bound on the initial dial.
    pub dial_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            password: None,
            dial_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Connection URL in `redis://[:password@]host` form.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => {
                format!("redis://:{password}@{}", self.host)
            }
            _ => format!("redis://{}", self.host),
        }
    }
}

/// Redis Stack document store.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects with the configured dial timeout and verifies the server
    /// answers PING.
    pub async fn connect(config: &RedisConfig) -> Result<Self, RagError> {
        if config.host.is_empty() {
            return Err(RagError::MissingConfig("store host".into()));
        }
        let client = redis::Client::open(config.url())
            .map_err(|e| RagError::store("invalid store url", e))?;
        let conn = tokio::time::timeout(config.dial_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| RagError::Timeout {
                duration: config.dial_timeout,
            })?
            .map_err(|e| RagError::store("unable to connect to store host", e))?;

        let store = Self { conn };
        store.ping().await?;
        debug!(host = %config.host, "connected to document store");
        Ok(store)
    }

    fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    async fn index_exists(&self, name: &str) -> bool {
        let mut conn = self.connection();
        redis::cmd("FT.INFO")
            .arg(name)
            .query_async::<Value>(&mut conn)
            .await
            .is_ok()
    }
}

fn store_err(message: &str, err: redis::RedisError) -> RagError {
    RagError::store(message.to_string(), err)
}

/// True for FT.SEARCH failures that only mean the index was never created.
fn is_missing_index_error(err: &redis::RedisError) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("no such index") || text.contains("unknown index")
}

/// Encodes an embedding as the little-endian f32 blob FT vector fields use.
fn embedding_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Double(d) => Some(d.to_string()),
        _ => None,
    }
}

/// Flattens an FT field array `[name, value, name, value, ...]` into a map.
fn fields_to_map(value: &Value) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Value::Array(items) = value {
        for pair in items.chunks(2) {
            if pair.len() < 2 {
                break;
            }
            if let (Some(name), Some(field_value)) =
                (value_to_string(&pair[0]), value_to_string(&pair[1]))
            {
                map.insert(name, field_value);
            }
        }
    }
    map
}

/// One parsed row of an FT.SEARCH reply.
#[derive(Debug)]
struct SearchRow {
    key: String,
    score: Option<f64>,
    fields: HashMap<String, String>,
}

/// Parses an RESP2 FT.SEARCH reply: `[count, key, (score,)? fields, ...]`.
fn parse_search_reply(reply: &Value, with_scores: bool) -> Vec<SearchRow> {
    let items = match reply {
        Value::Array(items) => items,
        _ => return Vec::new(),
    };
    if items.is_empty() {
        return Vec::new();
    }

    let stride = if with_scores { 3 } else { 2 };
    let mut rows = Vec::new();
    let mut i = 1;
    while i + stride - 1 < items.len() {
        let key = match value_to_string(&items[i]) {
            Some(key) => key,
            None => break,
        };
        let score = if with_scores {
            value_to_string(&items[i + 1]).and_then(|s| s.parse::<f64>().ok())
        } else {
            None
        };
        let fields = fields_to_map(&items[i + stride - 1]);
        rows.push(SearchRow { key, score, fields });
        i += stride;
    }
    rows
}

/// Derives the chunk key prefix covered by a vector index name.
///
/// Every vector index follows the `<retrieval prefix>aillm_vector_idx`
/// layout, and chunks of that prefix live under `doc:<retrieval prefix>*`.
fn vector_index_doc_prefix(index: &str) -> String {
    let retrieval_prefix = index.strip_suffix(VECTOR_INDEX_SUFFIX).unwrap_or(index);
    format!("doc:{retrieval_prefix}")
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn ping(&self) -> Result<(), RagError> {
        let mut conn = self.connection();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_err("store ping failed", e))?;
        if reply.eq_ignore_ascii_case("pong") {
            Ok(())
        } else {
            Err(RagError::store_msg(format!("unexpected ping reply: {reply}")))
        }
    }

    async fn put_json(&self, key: &str, value: &serde_json::Value) -> Result<(), RagError> {
        let payload = serde_json::to_string(value)
            .map_err(|e| RagError::store("json serialization failed", e))?;
        let mut conn = self.connection();
        redis::cmd("JSON.SET")
            .arg(key)
            .arg("$")
            .arg(payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_err("JSON.SET failed", e))
    }

    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, RagError> {
        let mut conn = self.connection();
        let payload: Option<String> = redis::cmd("JSON.GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_err("JSON.GET failed", e))?;
        match payload {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| RagError::store("stored record is not valid json", e)),
            None => Ok(None),
        }
    }

    async fn del_json(&self, key: &str, tag_index: &str) -> Result<(), RagError> {
        let mut conn = self.connection();
        redis::cmd("JSON.DEL")
            .arg(key)
            .arg("$")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_err("JSON.DEL failed", e))?;
        // Older servers kept a manual document registry per index; ignore
        // failures since modern FT indexes track JSON keys automatically.
        let _ = redis::cmd("FT.DEL")
            .arg(tag_index)
            .arg(key)
            .query_async::<Value>(&mut conn)
            .await;
        Ok(())
    }

    async fn del_by_pattern(&self, pattern: &str) -> Result<usize, RagError> {
        let keys = self.keys_by_pattern(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection();
        let mut cmd = redis::cmd("DEL");
        for key in &keys {
            cmd.arg(key);
        }
        let removed: usize = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| store_err("DEL failed", e))?;
        debug!(pattern, removed, "pattern delete");
        Ok(removed)
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, RagError> {
        let mut conn = self.connection();
        redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_err("KEYS failed", e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RagError> {
        let mut conn = self.connection();
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs())
            .query_async::<i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| store_err("EXPIRE failed", e))
    }

    async fn create_tag_index(&self, name: &str, key_prefix: &str) -> Result<(), RagError> {
        if self.index_exists(name).await {
            return Ok(());
        }
        let mut conn = self.connection();
        redis::cmd("FT.CREATE")
            .arg(name)
            .arg("ON")
            .arg("JSON")
            .arg("PREFIX")
            .arg(1)
            .arg(key_prefix)
            .arg("SCHEMA")
            .arg("$.Contents.*.GeneralKeys[*]")
            .arg("AS")
            .arg("GeneralKeys")
            .arg("TAG")
            .arg("$.Contents.*.Keys[*]")
            .arg("AS")
            .arg("Keys")
            .arg("TAG")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_err("FT.CREATE (tag) failed", e))
    }

    async fn create_text_index(&self, name: &str, key_prefix: &str) -> Result<(), RagError> {
        if self.index_exists(name).await {
            return Ok(());
        }
        let mut conn = self.connection();
        redis::cmd("FT.CREATE")
            .arg(name)
            .arg("ON")
            .arg("HASH")
            .arg("PREFIX")
            .arg(1)
            .arg(key_prefix)
            .arg("SCHEMA")
            .arg("content")
            .arg("TEXT")
            .arg("WEIGHT")
            .arg("2.0")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_err("FT.CREATE (text) failed", e))
    }

    async fn create_vector_index(&self, name: &str, dimensions: usize) -> Result<(), RagError> {
        if self.index_exists(name).await {
            return Ok(());
        }
        let mut conn = self.connection();
        redis::cmd("FT.CREATE")
            .arg(name)
            .arg("ON")
            .arg("HASH")
            .arg("PREFIX")
            .arg(1)
            .arg(vector_index_doc_prefix(name))
            .arg("SCHEMA")
            .arg("content")
            .arg("TEXT")
            .arg("embedding")
            .arg("VECTOR")
            .arg("FLAT")
            .arg(6)
            .arg("TYPE")
            .arg("FLOAT32")
            .arg("DIM")
            .arg(dimensions)
            .arg("DISTANCE_METRIC")
            .arg("COSINE")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_err("FT.CREATE (vector) failed", e))
    }

    async fn add_chunks(
        &self,
        index: &str,
        key_prefix: &str,
        chunks: Vec<ChunkRecord>,
    ) -> Result<Vec<String>, RagError> {
        let dimensions = match chunks.first() {
            Some(chunk) => chunk.embedding.len(),
            None => return Ok(Vec::new()),
        };
        self.create_vector_index(index, dimensions).await?;

        let mut conn = self.connection();
        let mut keys = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let key = format!("{key_prefix}{}", uuid::Uuid::new_v4().simple());
            let mut cmd = redis::cmd("HSET");
            cmd.arg(&key)
                .arg("content")
                .arg(&chunk.content)
                .arg("embedding")
                .arg(embedding_blob(&chunk.embedding));
            for (name, value) in &chunk.metadata {
                cmd.arg(name).arg(value);
            }
            cmd.query_async::<()>(&mut conn)
                .await
                .map_err(|e| store_err("HSET chunk failed", e))?;
            keys.push(key);
        }
        debug!(index, count = keys.len(), "chunks written");
        Ok(keys)
    }

    async fn vector_search(
        &self,
        index: &str,
        query: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let mut conn = self.connection();
        let expression = format!("(*)=>[KNN {k} @embedding $vec AS vector_distance]");
        let reply = redis::cmd("FT.SEARCH")
            .arg(index)
            .arg(expression)
            .arg("PARAMS")
            .arg(2)
            .arg("vec")
            .arg(embedding_blob(query))
            .arg("SORTBY")
            .arg("vector_distance")
            .arg("LIMIT")
            .arg(0)
            .arg(k)
            .arg("DIALECT")
            .arg(2)
            .query_async::<Value>(&mut conn)
            .await;
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) if is_missing_index_error(&err) => {
                return Err(RagError::IndexMissing(index.to_string()))
            }
            Err(err) => return Err(store_err("FT.SEARCH (vector) failed", err)),
        };

        let mut docs = Vec::new();
        for row in parse_search_reply(&reply, false) {
            // Cosine distance -> similarity.
            let distance: f32 = row
                .fields
                .get("vector_distance")
                .and_then(|d| d.parse().ok())
                .unwrap_or(1.0);
            let score = 1.0 - distance;
            if score < min_score {
                continue;
            }
            let mut metadata: HashMap<String, serde_json::Value> = row
                .fields
                .iter()
                .filter(|(name, _)| {
                    name.as_str() != "content"
                        && name.as_str() != "embedding"
                        && name.as_str() != "vector_distance"
                })
                .map(|(name, value)| {
                    (name.clone(), serde_json::Value::String(value.clone()))
                })
                .collect();
            metadata.insert("id".into(), serde_json::Value::String(row.key.clone()));
            docs.push(ScoredDocument {
                page_content: row.fields.get("content").cloned().unwrap_or_default(),
                score,
                metadata,
            });
        }
        Ok(docs)
    }

    async fn text_search(
        &self,
        index: &str,
        expression: &str,
        limit: usize,
    ) -> Result<Vec<TextHit>, RagError> {
        let mut conn = self.connection();
        let reply = redis::cmd("FT.SEARCH")
            .arg(index)
            .arg(expression)
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .arg("WITHSCORES")
            .query_async::<Value>(&mut conn)
            .await;
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) if is_missing_index_error(&err) => {
                return Err(RagError::IndexMissing(index.to_string()))
            }
            Err(err) => return Err(store_err("FT.SEARCH (text) failed", err)),
        };

        Ok(parse_search_reply(&reply, true)
            .into_iter()
            .map(|row| TextHit {
                key: row.key,
                score: row.score.unwrap_or(0.0),
                attributes: row.fields,
            })
            .collect())
    }

    async fn tag_search(
        &self,
        index: &str,
        expression: &str,
        return_fields: &[&str],
    ) -> Result<Vec<TagHit>, RagError> {
        let mut conn = self.connection();
        let mut cmd = redis::cmd("FT.SEARCH");
        cmd.arg(index)
            .arg(expression)
            .arg("RETURN")
            .arg(return_fields.len());
        for field in return_fields {
            cmd.arg(field);
        }
        let reply = cmd.query_async::<Value>(&mut conn).await;
        let reply = match reply {
            Ok(reply) => reply,
            Err(err) if is_missing_index_error(&err) => {
                warn!(index, "tag search against missing index");
                return Err(RagError::IndexMissing(index.to_string()));
            }
            Err(err) => return Err(store_err("FT.SEARCH (tag) failed", err)),
        };

        Ok(parse_search_reply(&reply, false)
            .into_iter()
            .map(|row| TagHit {
                key: row.key,
                fields: row.fields,
            })
            .collect())
    }
}
