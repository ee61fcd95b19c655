// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PIN handling: the login step on the home menu and transaction-PIN
//! capture for flows that need one mid-stream.

use serde_json::json;
use tracing::info;

use crate::menu::validate::is_valid_pin;
use crate::menu::{FrameAction, Step};
use crate::registry::Handler;
use crate::session::{AuthStatus, Slot};
use crate::state::AppState;
use crate::turn::Turn;
use crate::upstream::codec::mask_identifier;

/// Login or the forgot-PIN branch, driven from the home menu.
pub struct ProcessPinOrForgot;

#[async_trait::async_trait]
impl Handler for ProcessPinOrForgot {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let Some(input) = input else {
            // Rendering home shows the static welcome text.
            return Ok(None);
        };

        if input == "1" {
            return Ok(Some(Step::next("forgot_pin_info")));
        }
        if !is_valid_pin(input) {
            return Ok(Some(Step::retry(
                "home",
                "VALIDATION_ERROR",
                "Please enter a valid PIN (4-6 digits).",
            )));
        }

        state.sessions.store(&turn.key, &Slot::PinAttempt, &input).await?;

        let customer_id = turn
            .session
            .customer_data
            .as_ref()
            .map(|c| c.customer_id.clone())
            .unwrap_or_else(|| "GUEST".to_owned());
        let envelope = state.upstream.login(&turn.key, &turn.session, &customer_id, input).await;

        if envelope.success {
            let accounts: Vec<String> = envelope
                .data
                .get("ACCOUNTS")
                .map(String::as_str)
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();

            if let Some(customer) = turn.session.customer_data.as_mut() {
                customer.accounts = accounts.clone();
            }
            turn.session.auth_status = AuthStatus::Authenticated;
            state
                .sessions
                .update(
                    &turn.key,
                    json!({
                        "authStatus": "authenticated",
                        "customerData": { "accounts": accounts },
                    }),
                )
                .await?;
            state.sessions.store(&turn.key, &Slot::LoginData, &envelope.data).await?;

            info!(msisdn = %mask_identifier(&turn.key.msisdn), "login succeeded");
            return Ok(Some(Step::next("main_menu")));
        }

        Ok(Some(match envelope.status.as_str() {
            "101" => Step {
                action: FrameAction::Con,
                message: Some(
                    "Your PIN has expired. Please set a new PIN to continue.".to_owned(),
                ),
                next_menu: Some("change_pin_forced".to_owned()),
                ..Step::default()
            },
            "102" => Step::end(
                "Your account has been blocked. Please contact customer care or visit your nearest branch.",
            ),
            "091" => Step::retry("home", "INVALID_PIN", "Invalid Login Password"),
            _ => Step::retry("home", "LOGIN_FAILED", envelope.user_error()),
        }))
    }
}

/// Capture a transaction PIN, then return to wherever the flow came from.
pub struct CaptureTransactionPin;

#[async_trait::async_trait]
impl Handler for CaptureTransactionPin {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let Some(input) = input else { return Ok(None) };

        if !is_valid_pin(input) {
            return Ok(Some(Step::retry(
                "pin",
                "VALIDATION_ERROR",
                "Please enter a valid PIN (4-6 digits).",
            )));
        }

        state.sessions.store(&turn.key, &Slot::TransactionPin, &input).await?;
        let redirect: Option<String> = state.sessions.grab(&turn.key, &Slot::PinRedirect).await?;
        state.sessions.blank(&turn.key, &[Slot::PinRedirect]).await?;

        Ok(Some(Step::next(redirect.unwrap_or_else(|| "main_menu".to_owned()))))
    }
}

/// Second step of the forced PIN change: confirm the new PIN and push it
/// upstream.
pub struct ConfirmPinChange;

#[async_trait::async_trait]
impl Handler for ConfirmPinChange {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let Some(input) = input else { return Ok(None) };

        let new_pin: Option<String> =
            state.sessions.grab(&turn.key, &Slot::Named("new_pin".to_owned())).await?;
        let Some(new_pin) = new_pin else {
            return Ok(Some(Step::retry(
                "change_pin_forced",
                "STATE_LOST",
                "Please enter your new PIN again.",
            )));
        };
        if input != new_pin {
            state.sessions.blank(&turn.key, &[Slot::Named("new_pin".to_owned())]).await?;
            return Ok(Some(Step::retry(
                "change_pin_forced",
                "PIN_MISMATCH",
                "PINs do not match. Please start again.",
            )));
        }

        let old_pin: Option<String> = state.sessions.grab(&turn.key, &Slot::PinAttempt).await?;
        let data = format!(
            "OLDPIN:{}:NEWPIN:{new_pin}:",
            old_pin.unwrap_or_default()
        );
        let envelope =
            state.upstream.call("CHANGEPIN", &data, &turn.key, &turn.session, None, false).await;
        state
            .sessions
            .blank(&turn.key, &[Slot::Named("new_pin".to_owned()), Slot::PinAttempt])
            .await?;

        if envelope.success {
            Ok(Some(Step::end("Your PIN has been changed. Please dial again to continue.")))
        } else {
            Ok(Some(Step::retry("change_pin_forced", "API_ERROR", envelope.user_error())))
        }
    }
}

#[cfg(test)]
#[path = "pin_tests.rs"]
mod tests;
