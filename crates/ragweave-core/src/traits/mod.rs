// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits implemented by provider and store adapters.

pub mod embedding;
pub mod provider;
pub mod sink;
pub mod store;
pub mod transcriber;
pub mod vision;

pub use embedding::EmbeddingProvider;
pub use provider::{ChunkStream, LlmProvider};
pub use sink::{SessionEventSink, TokenSink};
pub use store::{ChunkRecord, DocumentStore, TagHit, TextHit};
pub use transcriber::{TranscribeConfig, Transcriber, Transcript};
pub use vision::VisionProvider;
