// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end turn scenarios against the shipped
//! configuration artefacts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum_test::TestServer;

use ussdgw::rules::BusinessRules;
use ussdgw::test_support::{StateBuilder, TestCtx};
use ussdgw::transport::build_router;
use ussdgw::upstream::ApiEndpoints;

/// Resolve the workspace root from this crate's manifest dir.
pub fn workspace_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    manifest.parent().and_then(Path::parent).unwrap_or(manifest).to_path_buf()
}

/// A gateway wired to the real `config/` artefacts, an in-memory KV, and
/// the programmable stub upstream.
pub struct Gateway {
    pub ctx: TestCtx,
    pub server: TestServer,
}

impl Gateway {
    pub async fn start() -> anyhow::Result<Self> {
        let root = workspace_root();
        let ctx = StateBuilder::new()
            .with_menu_dir(root.join("config/menus"))
            .with_endpoints(ApiEndpoints::load(&root.join("config/api-endpoints.json"))?)
            .with_rules(BusinessRules::load(&root.join("config/business-rules.json"))?)
            .build()
            .await?;
        let server = TestServer::new(build_router(ctx.state.clone()))
            .map_err(|e| anyhow::anyhow!("test server: {e}"))?;
        Ok(Self { ctx, server })
    }

    /// One aggregator turn; returns the plain-text frame body.
    pub async fn turn(&self, msisdn: &str, session_id: &str, input: &str) -> String {
        self.server
            .post("/api/ussd")
            .form(&[
                ("msisdn", msisdn),
                ("sessionid", session_id),
                ("shortcode", "527"),
                ("response", input),
            ])
            .await
            .text()
    }
}

/// A `tracing` writer capturing everything logged on the current thread,
/// for the no-PII-in-logs properties.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Install a subscriber writing into this capture; logging reverts
    /// when the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
