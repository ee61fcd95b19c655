// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! USSD session gateway for a mobile banking shortcode.

pub mod config;
pub mod error;
pub mod kv;
pub mod menu;
pub mod modules;
pub mod registry;
pub mod rules;
pub mod session;
pub mod state;
pub mod test_support;
pub mod transport;
pub mod turn;
pub mod upstream;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::kv::{Kv, RedisKv};
use crate::menu::MenuSet;
use crate::registry::Registry;
use crate::rules::BusinessRules;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::upstream::{ApiEndpoints, UpstreamClient};

/// Run the gateway until shutdown. Installs the tracing subscriber
/// unless the host already has one (test harnesses do).
pub async fn run(config: Config) -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    config.validate()?;

    let kv: Arc<dyn Kv> =
        Arc::new(RedisKv::connect(&config.redis_url(), config.redis_ready_timeout()).await?);
    let sessions = Arc::new(SessionStore::new(
        Arc::clone(&kv),
        &config.redis_session_prefix,
        config.redis_ttl,
        &config.timezone,
    ));

    let endpoints = if config.api_endpoints.exists() {
        ApiEndpoints::load(&config.api_endpoints)?
    } else {
        warn!(path = %config.api_endpoints.display(), "api endpoints file missing, using defaults");
        ApiEndpoints::default()
    };
    let rules = if config.business_rules.exists() {
        BusinessRules::load(&config.business_rules)?
    } else {
        warn!(path = %config.business_rules.display(), "business rules file missing, using defaults");
        BusinessRules::default()
    };

    let menus = Arc::new(MenuSet::load(&config.menu_dir)?);
    let upstream = Arc::new(UpstreamClient::new(&config, endpoints, Arc::clone(&sessions))?);

    let mut registry = Registry::new();
    modules::register_all(&mut registry);
    info!(handlers = registry.len(), "action modules registered");

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        config,
        kv,
        sessions,
        upstream,
        registry,
        menus: Arc::clone(&menus),
        rules,
    });

    // Hot reload stays active for the life of the watcher handle.
    let _watcher = menus.watch()?;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("shutdown signal received");
            shutdown.cancel();
        });
    }

    let router = transport::build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    info!("ussdgw listening on {addr}");
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(err) => {
                warn!(err = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
