// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One USSD turn: session fetch/create, expiry check, engine dispatch,
//! session write-back, frame emission.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::menu::{process, render, Frame, FrameAction, Step};
use crate::session::{CustomerData, Session, SessionKey};
use crate::state::AppState;
use crate::upstream::codec::mask_identifier;
use crate::upstream::Envelope;

/// A validated inbound turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub msisdn: String,
    pub session_id: String,
    pub shortcode: Option<String>,
    pub input: Option<String>,
}

/// Mutable state threaded through one turn. The session copy is the
/// working view; durable mutations also go through the session store.
pub struct Turn {
    pub key: SessionKey,
    pub session: Session,
    /// Scratch values exposed to templates under `data.*`.
    pub data: Map<String, Value>,
    handlers_invoked: HashSet<String>,
}

impl Turn {
    pub fn new(key: SessionKey, session: Session) -> Self {
        Self { key, session, data: Map::new(), handlers_invoked: HashSet::new() }
    }

    /// Template and condition context: `{customer, session, data, transaction}`.
    pub fn context(&self) -> Value {
        let customer =
            self.session.customer_data.clone().unwrap_or_else(CustomerData::guest);
        json!({
            "customer": customer,
            "session": self.session,
            "data": Value::Object(self.data.clone()),
            "transaction": { "count": self.session.transaction_count },
        })
    }

    /// One-shot guard so a node handler runs at most once per turn even
    /// when the same node is re-rendered. Returns true the first time.
    pub fn mark_handler(&mut self, menu: &str) -> bool {
        self.handlers_invoked.insert(menu.to_owned())
    }
}

/// Drive one turn to a frame. Everything except request validation is
/// absorbed here: failures become user-safe frames, never errors.
pub async fn handle_turn(state: &AppState, request: &TurnRequest) -> Frame {
    let started = std::time::Instant::now();
    let key = SessionKey::new(
        request.msisdn.clone(),
        request.session_id.clone(),
        request.shortcode.clone(),
    );

    let session = match obtain_session(state, &key).await {
        Ok(session) => session,
        Err(err) => {
            warn!(err = %err, "session store unavailable");
            return Frame {
                action: FrameAction::End,
                message: crate::error::ErrorKind::Unavailable.user_message().to_owned(),
            };
        }
    };

    let mut turn = Turn::new(key.clone(), session);
    ensure_customer(state, &mut turn).await;

    let menus = state.menus.snapshot();
    let current = turn.session.current_menu.clone();
    let input = request.input.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let mut step = match input {
        None => render::render(state, &menus, &current, &mut turn).await,
        Some(value) => process::process(state, &menus, &current, value, &mut turn).await,
    };

    // A routing step with nothing to say renders its destination.
    if step.message.is_none() && step.error_message.is_none() {
        let destination =
            step.next_menu.clone().unwrap_or_else(|| current.clone());
        let rendered = render::render(state, &menus, &destination, &mut turn).await;
        step = Step {
            next_menu: rendered.next_menu.clone().or(Some(destination)),
            ..rendered
        };
    }

    let frame = finish_turn(state, &mut turn, &current, step).await;

    info!(
        msisdn = %mask_identifier(&key.msisdn),
        session_id = %key.session_id,
        menu = %current,
        action = frame.action.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "turn"
    );
    frame
}

/// Fetch the session, recycling it when the TTL has elapsed; create a
/// fresh one when absent.
async fn obtain_session(state: &AppState, key: &SessionKey) -> anyhow::Result<Session> {
    if let Some(session) = state.sessions.get(key).await? {
        let elapsed = state.sessions.elapsed_seconds(key).await?;
        if elapsed <= state.sessions.ttl_seconds() {
            return Ok(session);
        }
        info!(session_id = %key.session_id, elapsed, "session past TTL, starting over");
        state.sessions.clear(key).await?;
    }
    Ok(state.sessions.create(key).await?)
}

/// Lazy customer lookup on the first `home` turn. A failed lookup falls
/// back to the guest identity so the menu can still render; a non-guest
/// record is never overwritten within a session.
async fn ensure_customer(state: &AppState, turn: &mut Turn) {
    if turn.session.current_menu != "home" || turn.session.customer_data.is_some() {
        return;
    }
    let envelope = state.upstream.get_customer(&turn.key, &turn.session).await;
    let customer = if envelope.success {
        customer_from_envelope(&envelope)
    } else {
        CustomerData::guest()
    };
    turn.session.customer_data = Some(customer.clone());
    if let Err(err) =
        state.sessions.update(&turn.key, json!({ "customerData": customer })).await
    {
        warn!(err = %err, "failed to persist customer data");
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

fn customer_from_envelope(envelope: &Envelope) -> CustomerData {
    let field = |name: &str| envelope.data.get(name).cloned().unwrap_or_default();
    CustomerData {
        customer_id: field("CUSTOMERID"),
        first_name: field("FIRSTNAME"),
        last_name: field("LASTNAME"),
        language: field("LANGUAGE"),
        accounts: split_list(&field("ACCOUNTS")),
        aliases: split_list(&field("ALIASES")),
        id_number: envelope.data.get("IDNUMBER").cloned().filter(|s| !s.is_empty()),
        email: envelope.data.get("EMAIL").cloned().filter(|s| !s.is_empty()),
    }
}

/// Persist the advanced menu state and emit the frame; `end` frames clear
/// the session so the next turn starts fresh.
async fn finish_turn(state: &AppState, turn: &mut Turn, current: &str, step: Step) -> Frame {
    let message = step
        .message
        .or(step.error_message)
        .unwrap_or_else(|| crate::error::ErrorKind::Internal.user_message().to_owned());
    let frame = Frame { action: step.action, message };

    if frame.action == FrameAction::End {
        if let Err(err) = state.sessions.clear(&turn.key).await {
            warn!(err = %err, "failed to clear ended session");
        }
        return frame;
    }

    let destination = step.next_menu.or(step.retry_menu);
    if let Some(menu) = destination.filter(|m| m != current) {
        let mut history = turn.session.menu_history.clone();
        if history.last() != Some(&menu) {
            history.push(menu.clone());
        }
        if let Err(err) = state
            .sessions
            .update(&turn.key, json!({ "currentMenu": menu, "menuHistory": history }))
            .await
        {
            warn!(err = %err, "failed to advance session menu");
        }
    }
    frame
}

#[cfg(test)]
#[path = "turn_tests.rs"]
mod tests;
