// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid retrieval over the document store.
//!
//! Five modes share one engine: cosine and KNN run against the vector
//! index, lexical runs token queries against the full-text index, hybrid
//! fuses the two rankings (RRF or weighted), and semantic is hybrid with a
//! widened candidate pool. A missing index is an empty result everywhere.

pub mod fusion;
pub mod lexical;
pub mod retriever;

pub use fusion::{content_hash, document_id, HybridConfig};
pub use lexical::{escape_query, extract_tokens, lexical_expression};
pub use retriever::Retriever;
