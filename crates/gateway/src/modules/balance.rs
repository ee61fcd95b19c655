// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Balance enquiry: account selection, PIN verification, then the query.

use crate::menu::validate::is_valid_pin;
use crate::menu::{FrameAction, Step};
use crate::registry::Handler;
use crate::session::Slot;
use crate::state::AppState;
use crate::turn::Turn;

/// Account selection step. Rendering lists the customer's accounts;
/// input picks one.
pub struct ProcessBalanceRequest;

#[async_trait::async_trait]
impl Handler for ProcessBalanceRequest {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let accounts = turn.session.accounts().to_vec();
        if accounts.is_empty() {
            return Ok(Some(Step::retry(
                "main_menu",
                "NO_ACCOUNTS",
                "No accounts are linked to your profile.",
            )));
        }

        let Some(input) = input else {
            let mut text = String::from("Select account:");
            for (index, account) in accounts.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", index + 1, account));
            }
            return Ok(Some(Step::con(text)));
        };

        let selection = input.trim().parse::<usize>().ok();
        let Some(account) = selection
            .filter(|index| (1..=accounts.len()).contains(index))
            .map(|index| accounts[index - 1].clone())
        else {
            return Ok(Some(Step::retry(
                "balance_accounts",
                "VALIDATION_ERROR",
                "Invalid selection. Please try again.",
            )));
        };

        state.sessions.store(&turn.key, &Slot::BalanceSelectedAccount, &account).await?;
        Ok(Some(Step::next("balance_pin")))
    }
}

/// PIN verification plus the balance query itself.
pub struct ProcessBalancePin;

#[async_trait::async_trait]
impl Handler for ProcessBalancePin {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let Some(input) = input else { return Ok(None) };

        if !is_valid_pin(input) {
            return Ok(Some(Step::retry(
                "balance_pin",
                "VALIDATION_ERROR",
                "Please enter a valid PIN (4-6 digits).",
            )));
        }

        let account: Option<String> =
            state.sessions.grab(&turn.key, &Slot::BalanceSelectedAccount).await?;
        let Some(account) = account else {
            return Ok(Some(Step::retry(
                "main_menu",
                "STATE_LOST",
                "Please select an account again.",
            )));
        };

        let customer_id = turn
            .session
            .customer_data
            .as_ref()
            .map(|c| c.customer_id.clone())
            .unwrap_or_else(|| "GUEST".to_owned());

        // Verify the PIN before issuing the query.
        let login = state.upstream.login(&turn.key, &turn.session, &customer_id, input).await;
        if !login.success {
            let message = match login.status.as_str() {
                "091" => "Invalid PIN".to_owned(),
                _ => login.user_error().to_owned(),
            };
            return Ok(Some(Step::retry("balance_pin", "INVALID_PIN", message)));
        }

        let envelope =
            state.upstream.balance(&turn.key, &turn.session, &customer_id, &account).await;
        state
            .sessions
            .blank(&turn.key, &[Slot::BalanceSelectedAccount, Slot::PinAttempt])
            .await?;

        if !envelope.success {
            return Ok(Some(Step::retry(
                "main_menu",
                "API_ERROR",
                "Unable to retrieve your balance. Please try again later.",
            )));
        }

        let _ = state.sessions.increment_transaction_count(&turn.key).await?;
        Ok(Some(Step {
            action: FrameAction::Con,
            message: Some(format_balance(&envelope.message)),
            next_menu: Some("main_menu".to_owned()),
            ..Step::default()
        }))
    }
}

/// Turn a pipe-separated `label|value|…` payload into display lines.
fn format_balance(message: &str) -> String {
    let mut lines = Vec::new();
    let mut parts = message.split('|');
    while let Some(label) = parts.next() {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        match parts.next().map(str::trim) {
            Some(value) if !value.is_empty() => lines.push(format!("{label}: {value}")),
            _ => lines.push(label.to_owned()),
        }
    }
    if lines.is_empty() {
        "Balance enquiry completed.".to_owned()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
#[path = "balance_tests.rs"]
mod tests;
