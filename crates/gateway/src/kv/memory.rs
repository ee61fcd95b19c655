// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`Kv`] with real TTL semantics, for tests and local runs
//! without a Redis cluster.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::kv::{Kv, KvError};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// HashMap-backed store mirroring the Redis adapter's TTL behaviour,
/// including KEEPTTL on TTL-less writes.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL of a key, if any. Test inspection helper.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        entry.expires_at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[async_trait::async_trait]
impl Kv for MemoryKv {
    async fn set(&self, key: &str, value: &[u8], ttl: Option<u64>) -> Result<(), KvError> {
        let mut entries = self.entries.lock().await;
        let expires_at = match ttl {
            Some(secs) => Some(Instant::now() + Duration::from_secs(secs)),
            // KEEPTTL: preserve the existing deadline, live or not-yet-set.
            None => entries.get(key).and_then(|e| e.expires_at),
        };
        entries.insert(key.to_owned(), Entry { value: value.to_vec(), expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|at| at <= Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
