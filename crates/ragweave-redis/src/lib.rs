// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis Stack implementation of the ragweave document store.
//!
//! Chunks live as hashes under `doc:*` keys with an f32-LE `embedding`
//! field; embedding objects and memory records live as RedisJSON documents;
//! search goes through `FT.SEARCH` over HASH (text, vector) and JSON (tag)
//! indexes. All index creation is idempotent via `FT.INFO` probing.

mod store;

pub use store::{RedisConfig, RedisStore};
