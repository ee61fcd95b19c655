// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::kv::MemoryKv;
use crate::session::{Session, SessionKey, SessionStore};
use crate::upstream::{ApiEndpoints, UpstreamClient};

/// Canned upstream that records hits and the last `b` payload.
struct StubUpstream {
    hits: AtomicU32,
    body: String,
    last_request: Mutex<Option<String>>,
}

async fn stub_handler(
    State(stub): State<Arc<StubUpstream>>,
    Query(params): Query<HashMap<String, String>>,
) -> String {
    stub.hits.fetch_add(1, Ordering::SeqCst);
    *stub.last_request.lock().await = params.get("b").cloned();
    stub.body.clone()
}

async fn spawn_stub(body: &str) -> anyhow::Result<(String, Arc<StubUpstream>)> {
    let stub = Arc::new(StubUpstream {
        hits: AtomicU32::new(0),
        body: body.to_owned(),
        last_request: Mutex::new(None),
    });
    let router = Router::new().route("/api", get(stub_handler)).with_state(Arc::clone(&stub));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((format!("http://{addr}/api"), stub))
}

fn key() -> SessionKey {
    SessionKey::new("254700111222", "S1", Some("527".into()))
}

async fn client_against(
    url: &str,
) -> anyhow::Result<(UpstreamClient, Arc<SessionStore>, Session)> {
    let kv = Arc::new(MemoryKv::new());
    let sessions = Arc::new(SessionStore::new(kv, "ussd:session", 300, "Africa/Nairobi"));
    let session = sessions.create(&key()).await?;

    let mut config = Config::for_tests();
    config.elma_api_url = url.to_owned();
    let client = UpstreamClient::new(&config, ApiEndpoints::default(), Arc::clone(&sessions))?;
    Ok((client, sessions, session))
}

#[tokio::test]
async fn cached_call_hits_network_once() -> anyhow::Result<()> {
    let (url, stub) = spawn_stub("STATUS:000:DATA:Wanjiku:").await?;
    let (client, _sessions, session) = client_against(&url).await?;

    let first = client.get_customer(&key(), &session).await;
    let second = client.get_customer(&key(), &session).await;

    assert!(first.success);
    assert_eq!(first, second, "cached envelope must be identical");
    assert_eq!(stub.hits.load(Ordering::SeqCst), 1, "exactly one network request");
    Ok(())
}

#[tokio::test]
async fn failed_envelope_is_not_cached() -> anyhow::Result<()> {
    let (url, stub) = spawn_stub("STATUS:091:MESSAGE:denied:").await?;
    let (client, _sessions, session) = client_against(&url).await?;

    let first = client.get_customer(&key(), &session).await;
    let second = client.get_customer(&key(), &session).await;

    assert!(!first.success);
    assert!(!second.success);
    assert_eq!(stub.hits.load(Ordering::SeqCst), 2, "failures must not short-circuit retries");
    Ok(())
}

#[tokio::test]
async fn force_refresh_bypasses_cache() -> anyhow::Result<()> {
    let (url, stub) = spawn_stub("STATUS:000:DATA:ok:").await?;
    let (client, _sessions, session) = client_against(&url).await?;

    client.call("GETCUSTOMER", "", &key(), &session, Some("customer_x"), false).await;
    client.call("GETCUSTOMER", "", &key(), &session, Some("customer_x"), true).await;

    assert_eq!(stub.hits.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn transport_error_becomes_retryable_envelope() -> anyhow::Result<()> {
    // Nothing listens on this port.
    let (client, _sessions, session) = client_against("http://127.0.0.1:9/api").await?;

    let envelope = client.login(&key(), &session, "C77", "1234").await;
    assert!(!envelope.success);
    assert_eq!(envelope.code.as_deref(), Some("API_CONNECTION_ERROR"));
    assert!(envelope.retry);
    Ok(())
}

#[tokio::test]
async fn request_carries_base_tuples_and_caller_overrides() -> anyhow::Result<()> {
    let (url, stub) = spawn_stub("STATUS:000:").await?;
    let (client, _sessions, mut session) = client_against(&url).await?;
    session.customer_data = Some(crate::session::CustomerData {
        customer_id: "C77".into(),
        accounts: vec!["0102030405-Main".into()],
        ..crate::session::CustomerData::guest()
    });

    client.login(&key(), &session, "C77", "1234").await;

    let sent = stub.last_request.lock().await.clone().unwrap_or_default();
    let tuples = crate::upstream::codec::parse_tuples(&sent);
    assert_eq!(tuples.get("FORMID").map(String::as_str), Some("LOGIN"));
    assert_eq!(tuples.get("MOBILENUMBER").map(String::as_str), Some("254700111222"));
    assert_eq!(tuples.get("DEVICEID").map(String::as_str), Some("254700111222527"));
    assert_eq!(tuples.get("CUSTOMERID").map(String::as_str), Some("C77"));
    assert_eq!(tuples.get("LOGINMPIN").map(String::as_str), Some("1234"));
    assert!(tuples.get("UNIQUEID").is_some_and(|u| u.len() == 36));
    Ok(())
}

#[tokio::test]
async fn login_and_balance_are_never_cached() -> anyhow::Result<()> {
    let (url, stub) = spawn_stub("STATUS:000:MESSAGE:BALANCE|KES 1,234.00:").await?;
    let (client, _sessions, session) = client_against(&url).await?;

    client.login(&key(), &session, "C77", "1234").await;
    client.login(&key(), &session, "C77", "1234").await;
    client.balance(&key(), &session, "C77", "0102030405").await;
    client.balance(&key(), &session, "C77", "0102030405").await;

    assert_eq!(stub.hits.load(Ordering::SeqCst), 4);
    Ok(())
}
