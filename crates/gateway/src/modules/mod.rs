// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action modules: small state machines over session slots that the menu
//! engine dispatches into. Registered under `{module}.{method}` names
//! with the short aliases menu configuration refers to.

use std::sync::Arc;

use crate::registry::Registry;

pub mod airtime;
pub mod balance;
pub mod pin;
pub mod statement;

/// Register every module handler and its aliases. Called once at init;
/// the registry is frozen afterwards.
pub fn register_all(registry: &mut Registry) {
    registry.register("pin.process_pin_or_forgot", Arc::new(pin::ProcessPinOrForgot));
    registry.register("pin.capture_transaction_pin", Arc::new(pin::CaptureTransactionPin));
    registry.register("pin.confirm_pin_change", Arc::new(pin::ConfirmPinChange));
    registry.register("balance.process_balance_request", Arc::new(balance::ProcessBalanceRequest));
    registry.register("balance.process_balance_pin", Arc::new(balance::ProcessBalancePin));
    registry.register("statement.select_account", Arc::new(statement::SelectStatementAccount));
    registry
        .register("statement.process_statement_request", Arc::new(statement::ProcessStatementRequest));
    registry
        .register("airtime.process_airtime_confirmation", Arc::new(airtime::ProcessAirtimeConfirmation));

    registry.alias("process_pin", "pin.process_pin_or_forgot");
    registry.alias("capture_pin", "pin.capture_transaction_pin");
    registry.alias("confirm_pin_change", "pin.confirm_pin_change");
    registry.alias("process_balance", "balance.process_balance_request");
    registry.alias("process_balance_pin", "balance.process_balance_pin");
    registry.alias("select_statement_account", "statement.select_account");
    registry.alias("process_statement", "statement.process_statement_request");
    registry.alias("process_airtime", "airtime.process_airtime_confirmation");
}
