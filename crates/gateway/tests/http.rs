// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the gateway HTTP API.
//!
//! Uses `axum_test::TestServer` — no real TCP needed for the inbound side;
//! the upstream stub listens on a loopback port.

use axum_test::TestServer;
use serde_json::json;

use ussdgw::test_support::{StateBuilder, TestCtx};
use ussdgw::transport::build_router;

async fn gateway() -> anyhow::Result<TestCtx> {
    StateBuilder::new()
        .with_menu_json(
            "home",
            json!({
                "message": "Hello {customer.firstName}, welcome to SidianVIBE (Mobile Banking)\n\nPlease enter your PIN to continue.\n\nForgot your PIN? Reply with 1 to reset your PIN",
                "inputConfig": { "validation": { "type": "pin_or_option" }, "handler": "process_pin" }
            }),
        )?
        .with_menu_json("forgot_pin_info", json!({ "message": "Visit a branch to reset." }))?
        .with_menu_json(
            "main_menu",
            json!({ "message": "Main Menu", "navigation": { "onExit": "end" } }),
        )?
        .build()
        .await
}

fn server(ctx: &TestCtx) -> anyhow::Result<TestServer> {
    TestServer::new(build_router(ctx.state.clone())).map_err(|e| anyhow::anyhow!("{e}"))
}

#[tokio::test]
async fn turn_accepts_form_bodies() -> anyhow::Result<()> {
    let ctx = gateway().await?;
    ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    let server = server(&ctx)?;

    let resp = server
        .post("/api/ussd")
        .form(&[
            ("msisdn", "254700111222"),
            ("sessionid", "S1"),
            ("shortcode", "527"),
            ("response", ""),
        ])
        .await;

    resp.assert_status_ok();
    let body = resp.text();
    assert!(body.starts_with("con Hello Customer, welcome to SidianVIBE"), "{body}");
    Ok(())
}

#[tokio::test]
async fn turn_accepts_json_bodies() -> anyhow::Result<()> {
    let ctx = gateway().await?;
    ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    let server = server(&ctx)?;

    let resp = server
        .post("/api/ussd")
        .json(&json!({
            "msisdn": "254700111222",
            "sessionid": "S2",
            "shortcode": "527"
        }))
        .await;

    resp.assert_status_ok();
    assert!(resp.text().starts_with("con Hello"), "{}", resp.text());
    Ok(())
}

#[tokio::test]
async fn missing_parameters_get_400_and_no_session() -> anyhow::Result<()> {
    let ctx = gateway().await?;
    let server = server(&ctx)?;

    let resp = server.post("/api/ussd").form(&[("msisdn", ""), ("sessionid", "S1")]).await;
    resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(resp.text(), "end Invalid parameters");

    // No session side effects and no upstream traffic.
    assert_eq!(ctx.upstream.hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_msisdn_is_rejected() -> anyhow::Result<()> {
    let ctx = gateway().await?;
    let server = server(&ctx)?;

    for msisdn in ["0700111222", "25470011", "254700111222333", "2547001112ab"] {
        let resp =
            server.post("/api/ussd").form(&[("msisdn", msisdn), ("sessionid", "S1")]).await;
        resp.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
    Ok(())
}

#[tokio::test]
async fn turn_responses_are_plain_text() -> anyhow::Result<()> {
    let ctx = gateway().await?;
    ctx.upstream.respond_to("GETCUSTOMER", "STATUS:091:").await;
    let server = server(&ctx)?;

    let resp = server
        .post("/api/ussd")
        .form(&[("msisdn", "254700111222"), ("sessionid", "S1")])
        .await;
    let content_type = resp.maybe_header("content-type");
    assert!(content_type
        .and_then(|v| v.to_str().ok().map(str::to_owned))
        .is_some_and(|v| v.starts_with("text/plain")));
    Ok(())
}

#[tokio::test]
async fn health_reports_services() -> anyhow::Result<()> {
    let ctx = gateway().await?;
    let server = server(&ctx)?;

    let resp = server.get("/health").await;
    resp.assert_status_ok();

    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["services"]["redis"], true);
    assert_eq!(body["services"]["session"], true);
    assert!(body["timestamp"].is_string());
    Ok(())
}
