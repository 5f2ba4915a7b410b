// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-tier session memory.
//!
//! The ephemeral tier is a process-local map with a TTL sweeper; the
//! persistent tier stores each turn as a chunk in a per-session vector
//! index plus a JSON record with the full turn list and an LLM-maintained
//! conversation summary.

pub mod ephemeral;
pub mod persistent;
pub mod types;

pub use ephemeral::MemoryManager;
pub use persistent::{MemoryReadout, PersistentMemory, PersistentMemoryConfig};
pub use types::{MemoryRecord, MemoryTurn};
