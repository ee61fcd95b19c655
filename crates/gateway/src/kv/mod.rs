// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin typed facade over the clustered key/value store.
//!
//! Higher layers decide retry policy; this layer only distinguishes a
//! working cluster from an unavailable one.

use std::fmt;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;

/// KV adapter failure. The cluster being down is the only interesting case.
#[derive(Debug, Clone)]
pub enum KvError {
    Unavailable { message: String },
}

impl KvError {
    pub fn unavailable(err: impl fmt::Display) -> Self {
        Self::Unavailable { message: err.to_string() }
    }
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { message } => write!(f, "kv unavailable: {message}"),
        }
    }
}

impl std::error::Error for KvError {}

/// Key/value store with per-key TTL.
#[async_trait::async_trait]
pub trait Kv: Send + Sync {
    /// Write a value. `ttl` in seconds; `None` must not clobber an
    /// existing TTL on the key.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<u64>) -> Result<(), KvError>;

    /// Read a value, or `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<(), KvError>;

    /// Probe the underlying cluster.
    async fn healthy(&self) -> bool;
}
