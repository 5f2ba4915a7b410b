// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic in-process adapters for ragweave tests.
//!
//! Provides an in-memory [`DocumentStore`](ragweave_core::DocumentStore)
//! with vector/text/tag index emulation, a scripted mock LLM that streams
//! character by character, and a bag-of-tokens mock embedder whose cosine
//! similarity behaves monotonically for overlapping texts. All tests in the
//! workspace run against these; nothing touches the network.

pub mod memory_store;
pub mod mock_embedder;
pub mod mock_llm;

pub use memory_store::MemoryStore;
pub use mock_embedder::MockEmbedder;
pub use mock_llm::{MockLlm, ScriptedResponse};
