// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Airtime purchase confirmation: gather the staged slots, enforce the
//! amount rules and the per-day aggregate, call the paybill rail.

use serde_json::Value;
use tracing::{info, warn};

use crate::menu::validate::{is_valid_msisdn, msisdn_to_254};
use crate::menu::Step;
use crate::registry::Handler;
use crate::session::Slot;
use crate::state::AppState;
use crate::turn::Turn;
use crate::upstream::codec::mask_identifier;

pub struct ProcessAirtimeConfirmation;

#[async_trait::async_trait]
impl Handler for ProcessAirtimeConfirmation {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>> {
        let Some(input) = input else {
            // Rendering: surface the staged values for the template.
            load_confirmation_data(state, turn).await?;
            return Ok(None);
        };

        if input != "1" {
            return Ok(Some(Step::next("mobilebanking")));
        }

        let amount = grab_amount(state, turn).await?;
        let Some(amount) = amount else {
            return Ok(Some(Step::retry(
                "mobilebanking",
                "STATE_LOST",
                "Please start the airtime purchase again.",
            )));
        };

        let mode: Option<String> = state.sessions.grab(&turn.key, &Slot::AirtimeMode).await?;
        let recipient = match mode.as_deref() {
            Some("other") => {
                let stored: Option<String> =
                    state.sessions.grab(&turn.key, &Slot::AirtimeRecipient).await?;
                match stored {
                    Some(recipient) => recipient,
                    None => {
                        return Ok(Some(Step::retry(
                            "mobilebanking",
                            "STATE_LOST",
                            "Please start the airtime purchase again.",
                        )))
                    }
                }
            }
            _ => turn.key.msisdn.clone(),
        };
        if !is_valid_msisdn(&recipient) {
            return Ok(Some(Step::retry(
                "mobilebanking",
                "VALIDATION_ERROR",
                "Invalid recipient number. Please start again.",
            )));
        }

        let rules = &state.rules.airtime;
        if amount < rules.min_amount || amount > rules.max_amount {
            return Ok(Some(Step::retry(
                "mobilebanking",
                "VALIDATION_ERROR",
                format!(
                    "Airtime amount must be between {} and {}.",
                    rules.min_amount, rules.max_amount
                ),
            )));
        }
        let spent_today = daily_total(state, &turn.key.msisdn).await;
        if spent_today + amount > rules.daily_limit {
            return Ok(Some(Step::retry(
                "mobilebanking",
                "LIMIT_EXCEEDED",
                format!("Daily airtime limit of {} exceeded.", rules.daily_limit),
            )));
        }

        // No transaction PIN yet: detour to the PIN menu and come back.
        let pin: Option<String> = state.sessions.grab(&turn.key, &Slot::TransactionPin).await?;
        let Some(pin) = pin else {
            state.sessions.store(&turn.key, &Slot::PinRedirect, &"airtime_confirm").await?;
            return Ok(Some(Step::next("pin")));
        };

        let network: Option<String> = state.sessions.grab(&turn.key, &Slot::Network).await?;
        let merchant: Option<String> = state.sessions.grab(&turn.key, &Slot::MerchantId).await?;
        let merchant = merchant.unwrap_or_else(|| "AIRTIME".to_owned());
        let account = state
            .sessions
            .grab::<String>(&turn.key, &Slot::Named("airtime_account".to_owned()))
            .await?
            .or_else(|| turn.session.accounts().first().cloned());
        let Some(account) = account else {
            return Ok(Some(Step::retry(
                "main_menu",
                "NO_ACCOUNTS",
                "No account available for this purchase.",
            )));
        };

        let recipient_intl = msisdn_to_254(&recipient);
        let envelope = state
            .upstream
            .airtime_purchase(
                &turn.key,
                &turn.session,
                &merchant,
                &account,
                &recipient_intl,
                amount,
                &pin,
            )
            .await;

        if !envelope.success {
            warn!(
                msisdn = %mask_identifier(&turn.key.msisdn),
                status = %envelope.status,
                "airtime purchase failed"
            );
            return Ok(Some(Step::retry(
                "airtime_confirm",
                "API_ERROR",
                format!(
                    "{} Reply 1 to retry or any other key to cancel.",
                    envelope.user_error()
                ),
            )));
        }

        add_daily_total(state, &turn.key.msisdn, spent_today + amount).await;
        let _ = state.sessions.increment_transaction_count(&turn.key).await?;
        state
            .sessions
            .blank(
                &turn.key,
                &[
                    Slot::AirtimeAmount,
                    Slot::AirtimeMode,
                    Slot::AirtimeRecipient,
                    Slot::TransactionPin,
                    Slot::Network,
                    Slot::MerchantId,
                ],
            )
            .await?;

        let reference = envelope
            .data
            .get("REFERENCE")
            .or_else(|| envelope.data.get("TRXID"))
            .cloned()
            .unwrap_or_else(|| envelope.message.clone());
        info!(
            msisdn = %mask_identifier(&turn.key.msisdn),
            amount,
            network = network.as_deref().unwrap_or("unknown"),
            "airtime purchase succeeded"
        );

        Ok(Some(Step::end(format!(
            "Airtime purchase of KES {amount} for {recipient_intl} successful. Ref: {reference}"
        ))))
    }
}

/// The staged amount. Menu input lands as a string, the module writes a
/// number; accept both.
async fn grab_amount(state: &AppState, turn: &Turn) -> anyhow::Result<Option<u64>> {
    Ok(match state.sessions.grab::<Value>(&turn.key, &Slot::AirtimeAmount).await? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Expose staged slot values to the confirmation template as `data.*`.
async fn load_confirmation_data(state: &AppState, turn: &mut Turn) -> anyhow::Result<()> {
    let amount = grab_amount(state, turn).await?;
    let mode: Option<String> = state.sessions.grab(&turn.key, &Slot::AirtimeMode).await?;
    let recipient: Option<String> =
        state.sessions.grab(&turn.key, &Slot::AirtimeRecipient).await?;

    let shown_recipient = match mode.as_deref() {
        Some("other") => recipient.unwrap_or_default(),
        _ => turn.key.msisdn.clone(),
    };
    if let Some(amount) = amount {
        turn.data.insert("airtime_amount".to_owned(), Value::from(amount));
    }
    turn.data.insert("airtime_recipient".to_owned(), Value::from(shown_recipient));
    Ok(())
}

fn daily_key(state: &AppState, msisdn: &str) -> String {
    let (date, _) = state.sessions.daily_window();
    state.sessions.prefixed(&format!("daily:{msisdn}:{date}"))
}

/// Aggregate airtime spend for this MSISDN today.
async fn daily_total(state: &AppState, msisdn: &str) -> u64 {
    match state.kv.get(&daily_key(state, msisdn)).await {
        Ok(Some(bytes)) => String::from_utf8_lossy(&bytes).trim().parse().unwrap_or(0),
        Ok(None) => 0,
        Err(err) => {
            warn!(err = %err, "daily total unavailable, treating as zero");
            0
        }
    }
}

async fn add_daily_total(state: &AppState, msisdn: &str, new_total: u64) {
    let (_, ttl) = state.sessions.daily_window();
    if let Err(err) = state
        .kv
        .set(&daily_key(state, msisdn), new_total.to_string().as_bytes(), Some(ttl))
        .await
    {
        warn!(err = %err, "failed to persist daily airtime total");
    }
}

#[cfg(test)]
#[path = "airtime_tests.rs"]
mod tests;
