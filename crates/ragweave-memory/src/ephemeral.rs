// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ephemeral session memory with a TTL sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::MemoryTurn;

/// Interval between sweeper passes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct SessionMemory {
    questions: Vec<MemoryTurn>,
    started_at: Instant,
}

/// Thread-safe per-session question list with time-based eviction.
///
/// A background task sweeps the map every ten minutes and evicts sessions
/// whose last write is older than the configured TTL. The sweeper stops
/// when the manager is dropped.
pub struct MemoryManager {
    sessions: Arc<Mutex<HashMap<String, SessionMemory>>>,
    ttl: Duration,
    sweeper: JoinHandle<()>,
}

impl MemoryManager {
    /// Creates a manager whose sessions expire after `ttl_minutes`.
    pub fn new(ttl_minutes: u64) -> Self {
        let sessions: Arc<Mutex<HashMap<String, SessionMemory>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let ttl = Duration::from_secs(ttl_minutes * 60);

        let sweep_target = Arc::clone(&sessions);
        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut map = sweep_target.lock().expect("memory lock");
                let before = map.len();
                map.retain(|_, memory| memory.started_at.elapsed() <= ttl);
                let evicted = before - map.len();
                if evicted > 0 {
                    debug!(evicted, "expired sessions swept");
                }
            }
        });

        Self {
            sessions,
            ttl,
            sweeper,
        }
    }

    /// Replaces a session's question list and resets its clock.
    pub fn add_memory(&self, session_id: &str, questions: Vec<MemoryTurn>) {
        let mut map = self.sessions.lock().expect("memory lock");
        map.insert(
            session_id.to_string(),
            SessionMemory {
                questions,
                started_at: Instant::now(),
            },
        );
    }

    /// Returns a session's questions, or `None` when the session is unknown
    /// or already past its TTL.
    pub fn get_memory(&self, session_id: &str) -> Option<Vec<MemoryTurn>> {
        let map = self.sessions.lock().expect("memory lock");
        map.get(session_id).and_then(|memory| {
            if memory.started_at.elapsed() > self.ttl {
                None
            } else {
                Some(memory.questions.clone())
            }
        })
    }

    /// Drops a session.
    pub fn delete_memory(&self, session_id: &str) {
        let mut map = self.sessions.lock().expect("memory lock");
        map.remove(session_id);
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("memory lock").len()
    }
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}
