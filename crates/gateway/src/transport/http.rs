// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers: the USSD turn and the health probe.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::turn::{handle_turn, TurnRequest};

/// Longest accepted `response` field, per the aggregator contract.
const MAX_INPUT_LEN: usize = 500;

/// Raw request body, form-urlencoded or JSON.
#[derive(Debug, Default, Deserialize)]
pub struct RawTurnRequest {
    #[serde(default)]
    pub msisdn: String,
    #[serde(default)]
    pub sessionid: String,
    #[serde(default)]
    pub shortcode: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub services: HealthServices,
}

#[derive(Debug, Serialize)]
pub struct HealthServices {
    pub redis: bool,
    pub session: bool,
}

// -- Handlers -----------------------------------------------------------------

/// `POST /api/ussd` — one USSD turn. The body is plain text
/// `"{action} {message}"`; validation failures are the only non-200.
pub async fn ussd_turn(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(raw) = parse_body(&headers, &body) else {
        return invalid_parameters();
    };
    let Some(request) = validate(raw) else {
        return invalid_parameters();
    };

    let frame = handle_turn(&state, &request).await;
    plain_text(StatusCode::OK, frame.render_line())
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let redis = state.kv.healthy().await;
    let session = state.sessions.healthy().await;
    let healthy = redis && session;

    let body = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        timestamp: state.sessions.stamp(),
        services: HealthServices { redis, session },
    };
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body)).into_response()
}

// -- Request plumbing ---------------------------------------------------------

fn parse_body(headers: &HeaderMap, body: &Bytes) -> Option<RawTurnRequest> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    if content_type.starts_with("application/json") {
        serde_json::from_slice(body).ok()
    } else {
        serde_urlencoded::from_bytes(body).ok()
    }
}

/// Shape checks per the aggregator contract. Anything off is an
/// `InvalidRequest`; no session is touched.
fn validate(raw: RawTurnRequest) -> Option<TurnRequest> {
    let msisdn = raw.msisdn.trim();
    if msisdn.len() != 12
        || !msisdn.starts_with("254")
        || !msisdn.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let session_id = raw.sessionid.trim();
    if !(3..=50).contains(&session_id.len()) {
        return None;
    }

    let shortcode = match raw.shortcode.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(code) => {
            if !(3..=6).contains(&code.len()) || !code.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(code.to_owned())
        }
        None => None,
    };

    let input = match raw.response {
        Some(response) if response.len() > MAX_INPUT_LEN => return None,
        other => other,
    };

    Some(TurnRequest {
        msisdn: msisdn.to_owned(),
        session_id: session_id.to_owned(),
        shortcode,
        input,
    })
}

fn invalid_parameters() -> Response {
    plain_text(StatusCode::BAD_REQUEST, "end Invalid parameters".to_owned())
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
