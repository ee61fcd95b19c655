// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the telco aggregator.

pub mod http;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the axum `Router` with the turn and health routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ussd", post(http::ussd_turn))
        .route("/health", get(http::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
