// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end turn scenarios over the shipped menu configuration, with
//! literal expected frames.

use ussdgw::kv::Kv;
use ussdgw::session::{epoch_ms, AuthStatus, SessionKey, Slot};
use ussdgw_specs::{Gateway, LogCapture};

const MSISDN: &str = "254700111222";

fn key(session_id: &str) -> SessionKey {
    SessionKey::new(MSISDN, session_id, Some("527".into()))
}

// -- Scenario 1: fresh session, unknown customer ------------------------------

#[tokio::test]
async fn fresh_session_unknown_customer() -> anyhow::Result<()> {
    let gw = Gateway::start().await?;
    gw.ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:MESSAGE:not found:").await;

    let body = gw.turn(MSISDN, "S1", "").await;
    assert_eq!(
        body,
        "con Hello Customer, welcome to SidianVIBE (Mobile Banking)\n\nPlease enter your PIN to continue.\n\nForgot your PIN? Reply with 1 to reset your PIN"
    );

    let session = gw
        .ctx
        .state
        .sessions
        .get(&key("S1"))
        .await?
        .ok_or_else(|| anyhow::anyhow!("session should exist"))?;
    assert_eq!(session.current_menu, "home");
    assert_eq!(session.customer_data.map(|c| c.customer_id), Some("GUEST".to_owned()));
    Ok(())
}

// -- Scenario 2: forgot-PIN branch --------------------------------------------

#[tokio::test]
async fn forgot_pin_branch() -> anyhow::Result<()> {
    let gw = Gateway::start().await?;
    gw.ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;

    gw.turn(MSISDN, "S1", "").await;
    let body = gw.turn(MSISDN, "S1", "1").await;

    assert!(body.starts_with("con "), "{body}");
    let session = gw
        .ctx
        .state
        .sessions
        .get(&key("S1"))
        .await?
        .ok_or_else(|| anyhow::anyhow!("session should exist"))?;
    assert_eq!(session.current_menu, "forgot_pin_info");
    assert!(gw.ctx.upstream.requests_for("LOGIN").await.is_empty(), "no login for the branch");
    Ok(())
}

// -- Scenario 3: successful PIN -----------------------------------------------

#[tokio::test]
async fn successful_pin() -> anyhow::Result<()> {
    let gw = Gateway::start().await?;
    gw.ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    gw.ctx
        .upstream
        .respond_to("LOGIN", "STATUS:000:ACCOUNTS:0102030405-Main,0102030406-Savings:")
        .await;

    gw.turn(MSISDN, "S1", "").await;
    let body = gw.turn(MSISDN, "S1", "1234").await;
    assert!(body.starts_with("con "), "{body}");

    let session = gw
        .ctx
        .state
        .sessions
        .get(&key("S1"))
        .await?
        .ok_or_else(|| anyhow::anyhow!("session should exist"))?;
    assert_eq!(session.auth_status, AuthStatus::Authenticated);
    assert_eq!(
        session.accounts(),
        ["0102030405-Main".to_owned(), "0102030406-Savings".to_owned()]
    );
    assert_eq!(session.current_menu, "main_menu");
    assert_eq!(gw.ctx.upstream.requests_for("LOGIN").await.len(), 1);

    let attempt: Option<String> =
        gw.ctx.state.sessions.grab(&key("S1"), &Slot::PinAttempt).await?;
    assert_eq!(attempt.as_deref(), Some("1234"));
    Ok(())
}

// -- Scenario 4: blocked account ----------------------------------------------

#[tokio::test]
async fn blocked_account() -> anyhow::Result<()> {
    let gw = Gateway::start().await?;
    gw.ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    gw.ctx.upstream.respond_to("LOGIN", "STATUS:102:MESSAGE:blocked:").await;

    gw.turn(MSISDN, "S1", "").await;
    let body = gw.turn(MSISDN, "S1", "1234").await;

    assert!(body.starts_with("end Your account has been blocked"), "{body}");
    assert!(gw.ctx.state.sessions.get(&key("S1")).await?.is_none(), "session cleared");
    Ok(())
}

// -- Scenario 5: balance happy path -------------------------------------------

#[tokio::test]
async fn balance_happy_path() -> anyhow::Result<()> {
    let gw = Gateway::start().await?;
    gw.ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    gw.ctx
        .upstream
        .respond_to("LOGIN", "STATUS:000:ACCOUNTS:0102030405-Main,0102030406-Savings:")
        .await;
    gw.ctx
        .upstream
        .respond_to("B-", "STATUS:000:MESSAGE:BALANCE|KES 1,234.00|AVAILABLE|KES 1,200.00:")
        .await;

    gw.turn(MSISDN, "S1", "").await;
    gw.turn(MSISDN, "S1", "1234").await; // login → main menu

    let accounts = gw.turn(MSISDN, "S1", "3").await;
    assert!(accounts.contains("1. 0102030405-Main"), "{accounts}");

    let pin_prompt = gw.turn(MSISDN, "S1", "1").await;
    assert!(pin_prompt.contains("PIN"), "{pin_prompt}");

    let body = gw.turn(MSISDN, "S1", "1234").await;
    assert!(body.starts_with("con "), "{body}");
    assert!(body.contains("BALANCE: KES 1,234.00"), "{body}");
    assert!(body.contains("AVAILABLE: KES 1,200.00"), "{body}");
    Ok(())
}

// -- Scenario 6: session expiry -----------------------------------------------

#[tokio::test]
async fn session_expiry_starts_fresh() -> anyhow::Result<()> {
    let gw = Gateway::start().await?;
    gw.ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    gw.ctx.upstream.respond_to("LOGIN", "STATUS:000:ACCOUNTS:0102030405-Main:").await;

    gw.turn(MSISDN, "S1", "").await;
    gw.turn(MSISDN, "S1", "1234").await;

    // Simulate a wall-clock gap of TTL+1 seconds.
    let ttl = gw.ctx.state.config.redis_ttl;
    let backdated = epoch_ms().saturating_sub((ttl + 1) * 1000);
    gw.ctx
        .kv
        .set(
            "ussd:session:254700111222:S1:527:start",
            backdated.to_string().as_bytes(),
            Some(ttl),
        )
        .await?;

    let body = gw.turn(MSISDN, "S1", "").await;
    assert!(body.starts_with("con Hello Customer"), "fresh home frame, got: {body}");

    let session = gw
        .ctx
        .state
        .sessions
        .get(&key("S1"))
        .await?
        .ok_or_else(|| anyhow::anyhow!("fresh session should exist"))?;
    assert_eq!(session.current_menu, "home");
    assert!(session.accounts().is_empty(), "no accounts survive expiry");
    assert_eq!(session.auth_status, AuthStatus::Pending);
    Ok(())
}

// -- Masking properties -------------------------------------------------------

#[tokio::test]
async fn logs_never_carry_pins_or_full_msisdns() -> anyhow::Result<()> {
    let capture = LogCapture::new();
    let _guard = capture.install();

    let gw = Gateway::start().await?;
    gw.ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    gw.ctx.upstream.respond_to("LOGIN", "STATUS:000:ACCOUNTS:0102030405-Main:").await;

    gw.turn(MSISDN, "S1", "").await;
    gw.turn(MSISDN, "S1", "7890").await;

    let logs = capture.contents();
    assert!(!logs.is_empty(), "expected captured log output");
    assert!(!logs.contains("7890"), "PIN leaked into logs");
    assert!(!logs.contains(MSISDN), "full MSISDN leaked into logs");
    Ok(())
}
