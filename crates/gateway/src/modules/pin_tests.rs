// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use crate::menu::{FrameAction, Step};
use crate::modules::pin::{CaptureTransactionPin, ProcessPinOrForgot};
use crate::registry::Handler;
use crate::session::{AuthStatus, CustomerData, SessionKey, Slot};
use crate::test_support::{StateBuilder, TestCtx};
use crate::turn::Turn;

fn key() -> SessionKey {
    SessionKey::new("254700111222", "S1", Some("527".into()))
}

async fn turn_with_customer(ctx: &TestCtx) -> anyhow::Result<Turn> {
    let session = ctx.state.sessions.create(&key()).await?;
    let mut turn = Turn::new(key(), session);
    let customer = CustomerData {
        customer_id: "C77".into(),
        first_name: "Wanjiku".into(),
        ..CustomerData::guest()
    };
    ctx.state.sessions.update(&key(), json!({ "customerData": customer })).await?;
    turn.session.customer_data = Some(customer);
    Ok(turn)
}

#[tokio::test]
async fn forgot_pin_branch_skips_login() -> anyhow::Result<()> {
    let ctx = StateBuilder::new().build().await?;
    let mut turn = turn_with_customer(&ctx).await?;

    let step = ProcessPinOrForgot.handle(Some("1"), &ctx.state, &mut turn).await?;
    assert_eq!(step, Some(Step::next("forgot_pin_info")));
    assert!(ctx.upstream.requests_for("LOGIN").await.is_empty(), "no login call for the branch");
    Ok(())
}

#[tokio::test]
async fn malformed_pin_reprompts_home() -> anyhow::Result<()> {
    let ctx = StateBuilder::new().build().await?;
    for pin in ["12", "1234567", "12a4"] {
        let mut turn = turn_with_customer(&ctx).await?;
        let step = ProcessPinOrForgot
            .handle(Some(pin), &ctx.state, &mut turn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("expected a step for {pin}"))?;
        assert!(step.is_error(), "{pin} should be rejected");
        assert_eq!(step.retry_menu.as_deref(), Some("home"));
    }
    assert!(ctx.upstream.requests_for("LOGIN").await.is_empty());
    Ok(())
}

#[tokio::test]
async fn successful_login_authenticates_and_extracts_accounts() -> anyhow::Result<()> {
    let ctx = StateBuilder::new().build().await?;
    ctx.upstream
        .respond_to("LOGIN", "STATUS:000:ACCOUNTS:0102030405-Main, 0102030406-Savings,:")
        .await;
    let mut turn = turn_with_customer(&ctx).await?;

    let step = ProcessPinOrForgot.handle(Some("1234"), &ctx.state, &mut turn).await?;
    assert_eq!(step, Some(Step::next("main_menu")));

    assert_eq!(turn.session.auth_status, AuthStatus::Authenticated);
    assert_eq!(
        turn.session.accounts(),
        ["0102030405-Main".to_owned(), "0102030406-Savings".to_owned()]
    );

    // Durable state matches the working copy.
    let stored = ctx
        .state
        .sessions
        .get(&key())
        .await?
        .ok_or_else(|| anyhow::anyhow!("session vanished"))?;
    assert_eq!(stored.auth_status, AuthStatus::Authenticated);
    assert_eq!(stored.accounts().len(), 2);

    let attempt: Option<String> = ctx.state.sessions.grab(&key(), &Slot::PinAttempt).await?;
    assert_eq!(attempt.as_deref(), Some("1234"));
    assert_eq!(ctx.upstream.requests_for("LOGIN").await.len(), 1, "exactly one login call");
    Ok(())
}

#[tokio::test]
async fn blocked_account_ends_session() -> anyhow::Result<()> {
    let ctx = StateBuilder::new().build().await?;
    ctx.upstream.respond_to("LOGIN", "STATUS:102:MESSAGE:blocked:").await;
    let mut turn = turn_with_customer(&ctx).await?;

    let step = ProcessPinOrForgot
        .handle(Some("1234"), &ctx.state, &mut turn)
        .await?
        .ok_or_else(|| anyhow::anyhow!("expected a step"))?;
    assert_eq!(step.action, FrameAction::End);
    assert!(step
        .message
        .as_deref()
        .is_some_and(|m| m.starts_with("Your account has been blocked")));
    Ok(())
}

#[tokio::test]
async fn expired_pin_forces_change() -> anyhow::Result<()> {
    let ctx = StateBuilder::new().build().await?;
    ctx.upstream.respond_to("LOGIN", "STATUS:101:MESSAGE:expired:").await;
    let mut turn = turn_with_customer(&ctx).await?;

    let step = ProcessPinOrForgot
        .handle(Some("1234"), &ctx.state, &mut turn)
        .await?
        .ok_or_else(|| anyhow::anyhow!("expected a step"))?;
    assert_eq!(step.action, FrameAction::Con);
    assert_eq!(step.next_menu.as_deref(), Some("change_pin_forced"));
    assert!(step.message.as_deref().is_some_and(|m| m.starts_with("Your PIN has expired")));
    Ok(())
}

#[tokio::test]
async fn invalid_pin_status_reprompts() -> anyhow::Result<()> {
    let ctx = StateBuilder::new().build().await?;
    ctx.upstream.respond_to("LOGIN", "STATUS:091:MESSAGE:bad:").await;
    let mut turn = turn_with_customer(&ctx).await?;

    let step = ProcessPinOrForgot
        .handle(Some("1234"), &ctx.state, &mut turn)
        .await?
        .ok_or_else(|| anyhow::anyhow!("expected a step"))?;
    assert_eq!(step.error_message.as_deref(), Some("Invalid Login Password"));
    assert_eq!(step.retry_menu.as_deref(), Some("home"));
    Ok(())
}

#[tokio::test]
async fn capture_pin_returns_to_redirect() -> anyhow::Result<()> {
    let ctx = StateBuilder::new().build().await?;
    let mut turn = turn_with_customer(&ctx).await?;
    ctx.state.sessions.store(&key(), &Slot::PinRedirect, &"airtime_confirm").await?;

    let step = CaptureTransactionPin.handle(Some("4321"), &ctx.state, &mut turn).await?;
    assert_eq!(step, Some(Step::next("airtime_confirm")));

    let pin: Option<String> = ctx.state.sessions.grab(&key(), &Slot::TransactionPin).await?;
    assert_eq!(pin.as_deref(), Some("4321"));
    assert!(!ctx.state.sessions.possess(&key(), &Slot::PinRedirect).await?, "hint is consumed");
    Ok(())
}
