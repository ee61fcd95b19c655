// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::kv::{Kv, MemoryKv};

#[tokio::test]
async fn set_get_del_roundtrip() -> anyhow::Result<()> {
    let kv = MemoryKv::new();
    kv.set("k", b"value", Some(60)).await?;
    assert_eq!(kv.get("k").await?, Some(b"value".to_vec()));

    kv.del("k").await?;
    assert_eq!(kv.get("k").await?, None);
    // Deleting again is a no-op.
    kv.del("k").await?;
    Ok(())
}

#[tokio::test]
async fn ttl_less_set_keeps_existing_deadline() -> anyhow::Result<()> {
    let kv = MemoryKv::new();
    kv.set("k", b"one", Some(60)).await?;
    kv.set("k", b"two", None).await?;

    let ttl = kv.ttl("k").await;
    assert!(ttl.is_some(), "rewrite without TTL must not clear the deadline");
    assert!(ttl.is_some_and(|t| t <= Duration::from_secs(60)));
    assert_eq!(kv.get("k").await?, Some(b"two".to_vec()));
    Ok(())
}

#[tokio::test]
async fn expired_key_reads_as_absent() -> anyhow::Result<()> {
    let kv = MemoryKv::new();
    kv.set("k", b"v", Some(0)).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(kv.get("k").await?, None);
    Ok(())
}

#[tokio::test]
async fn missing_key_has_no_ttl() {
    let kv = MemoryKv::new();
    assert_eq!(kv.ttl("nope").await, None);
}
