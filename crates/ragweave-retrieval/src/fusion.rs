// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rank fusion for hybrid search.
//!
//! Vector and lexical rankings merge by document identity, either with
//! weighted Reciprocal Rank Fusion or with a weighted score sum. Fused
//! documents carry `hybrid_score`, `vector_score`, `lexical_score`, and
//! `search_type` annotations in their metadata.

use std::collections::HashMap;

use ragweave_core::error::RagError;
use ragweave_core::types::ScoredDocument;

/// Configuration for hybrid search fusion.
#[derive(Debug, Clone, Copy)]
pub struct HybridConfig {
    /// Weight for the vector ranking (0.0 to 1.0).
    pub vector_weight: f64,
    /// Weight for the lexical ranking (0.0 to 1.0).
    pub lexical_weight: f64,
    /// Minimum vector similarity admitted into fusion.
    pub min_vector_score: f32,
    /// Minimum lexical relevance admitted into fusion.
    pub min_lexical_score: f32,
    /// Fuse with Reciprocal Rank Fusion instead of weighted scores.
    pub use_rrf: bool,
    /// RRF constant per the research literature.
    pub rrf_constant: f64,
    /// Candidate pool size per source before fusion.
    pub max_results: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            lexical_weight: 0.3,
            min_vector_score: 0.0,
            min_lexical_score: 0.0,
            use_rrf: true,
            rrf_constant: 60.0,
            max_results: 50,
        }
    }
}

impl HybridConfig {
    /// Validates weights and normalizes them to sum to 1.
    pub fn validated(mut self) -> Result<Self, RagError> {
        if self.vector_weight < 0.0 || self.vector_weight > 1.0 {
            return Err(RagError::InvalidOption(
                "vector weight must be between 0 and 1".into(),
            ));
        }
        if self.lexical_weight < 0.0 || self.lexical_weight > 1.0 {
            return Err(RagError::InvalidOption(
                "lexical weight must be between 0 and 1".into(),
            ));
        }
        let total = self.vector_weight + self.lexical_weight;
        if total == 0.0 {
            return Err(RagError::InvalidOption(
                "at least one fusion weight must be positive".into(),
            ));
        }
        if (total - 1.0).abs() > f64::EPSILON {
            self.vector_weight /= total;
            self.lexical_weight /= total;
        }
        Ok(self)
    }
}

/// Identity of a document across rankings: the `id` metadata attribute,
/// falling back to a hash of the content.
pub fn document_id(doc: &ScoredDocument) -> String {
    match doc.metadata_str("id") {
        Some(id) => id.to_string(),
        None => format!("{:x}", content_hash(&doc.page_content)),
    }
}

/// 32-bit multiplicative content hash used as the identity fallback.
pub fn content_hash(text: &str) -> u32 {
    let mut hash: u32 = 0;
    for c in text.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as u32);
    }
    hash
}

struct Fused {
    doc: ScoredDocument,
    vector_score: f64,
    lexical_score: f64,
    hybrid_score: f64,
    search_type: &'static str,
}

/// Weighted RRF contribution of one ranking position (1-based rank).
fn rrf_term(rank: usize, weight: f64, constant: f64) -> f64 {
    weight * (1.0 / (constant + rank as f64))
}

/// Merges the two rankings into annotated documents sorted by hybrid score.
pub fn fuse(
    vector_results: Vec<ScoredDocument>,
    lexical_results: Vec<(ScoredDocument, f64)>,
    config: &HybridConfig,
) -> Vec<ScoredDocument> {
    let mut merged: HashMap<String, Fused> = HashMap::new();
    let vector_ranks: HashMap<String, usize> = vector_results
        .iter()
        .enumerate()
        .map(|(i, doc)| (document_id(doc), i + 1))
        .collect();

    for (i, doc) in vector_results.into_iter().enumerate() {
        let rank = i + 1;
        let vector_score = doc.score as f64;
        let hybrid_score = if config.use_rrf {
            rrf_term(rank, config.vector_weight, config.rrf_constant)
        } else {
            config.vector_weight * vector_score
        };
        merged.insert(
            document_id(&doc),
            Fused {
                doc,
                vector_score,
                lexical_score: 0.0,
                hybrid_score,
                search_type: "vector",
            },
        );
    }

    for (i, (doc, lexical_score)) in lexical_results.into_iter().enumerate() {
        let rank = i + 1;
        let id = document_id(&doc);
        match merged.get_mut(&id) {
            Some(existing) => {
                existing.hybrid_score = if config.use_rrf {
                    let vector_rank = vector_ranks[&id];
                    rrf_term(vector_rank, config.vector_weight, config.rrf_constant)
                        + rrf_term(rank, config.lexical_weight, config.rrf_constant)
                } else {
                    config.vector_weight * existing.vector_score
                        + config.lexical_weight * lexical_score
                };
                existing.lexical_score = lexical_score;
                existing.search_type = "hybrid";
            }
            None => {
                let hybrid_score = if config.use_rrf {
                    rrf_term(rank, config.lexical_weight, config.rrf_constant)
                } else {
                    config.lexical_weight * lexical_score
                };
                merged.insert(
                    id,
                    Fused {
                        doc,
                        vector_score: 0.0,
                        lexical_score,
                        hybrid_score,
                        search_type: "lexical",
                    },
                );
            }
        }
    }

    let mut fused: Vec<Fused> = merged.into_values().collect();
    fused.sort_by(|a, b| {
        b.hybrid_score
            .partial_cmp(&a.hybrid_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    fused
        .into_iter()
        .map(|hit| {
            let mut doc = hit.doc;
            doc.metadata
                .insert("hybrid_score".into(), number(hit.hybrid_score));
            doc.metadata
                .insert("vector_score".into(), number(hit.vector_score));
            doc.metadata
                .insert("lexical_score".into(), number(hit.lexical_score));
            doc.metadata.insert(
                "search_type".into(),
                serde_json::Value::String(hit.search_type.to_string()),
            );
            doc.score = hit.hybrid_score as f32;
            doc
        })
        .collect()
}

fn number(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
