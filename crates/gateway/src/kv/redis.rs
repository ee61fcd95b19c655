// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed [`Kv`] over a reconnecting connection manager.

use std::time::Duration;

use redis::aio::ConnectionManager;

use crate::kv::{Kv, KvError};

/// Redis adapter. Every call is bounded by the readiness timeout; beyond
/// that the cluster counts as unavailable.
#[derive(Clone)]
pub struct RedisKv {
    manager: ConnectionManager,
    ready_timeout: Duration,
}

impl RedisKv {
    /// Connect, waiting up to `ready_timeout` for the cluster.
    pub async fn connect(url: &str, ready_timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = tokio::time::timeout(ready_timeout, client.get_connection_manager())
            .await
            .map_err(|_| anyhow::anyhow!("redis not ready within {ready_timeout:?}"))??;
        Ok(Self { manager, ready_timeout })
    }

    async fn run<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T, KvError> {
        let mut conn = self.manager.clone();
        match tokio::time::timeout(self.ready_timeout, cmd.query_async(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(KvError::unavailable(err)),
            Err(_) => Err(KvError::unavailable("timed out waiting for cluster")),
        }
    }
}

#[async_trait::async_trait]
impl Kv for RedisKv {
    async fn set(&self, key: &str, value: &[u8], ttl: Option<u64>) -> Result<(), KvError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        match ttl {
            Some(secs) => {
                cmd.arg("EX").arg(secs);
            }
            // Plain SET resets the TTL; KEEPTTL preserves whatever is there.
            None => {
                cmd.arg("KEEPTTL");
            }
        }
        self.run::<()>(&cmd).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        self.run(redis::cmd("GET").arg(key)).await
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.run::<()>(redis::cmd("DEL").arg(key)).await
    }

    async fn healthy(&self) -> bool {
        self.run::<String>(&redis::cmd("PING")).await.is_ok()
    }
}
