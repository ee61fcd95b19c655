// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process user input against a menu node: navigation first, then the
//! node handler, then numbered options, then free-form input.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::menu::condition::evaluate;
use crate::menu::render::substitute;
use crate::menu::validate::{
    apply_transform, is_valid_msisdn, is_valid_msisdn_for, is_valid_pin, validate_amount,
    validate_date, Verdict,
};
use crate::menu::{
    resolve_path, ActionSpec, InputConfig, MenuNode, MenuOption, Step, ValidationRule,
};
use crate::session::Slot;
use crate::state::AppState;
use crate::turn::Turn;

pub async fn process(
    state: &AppState,
    menus: &HashMap<String, Arc<MenuNode>>,
    name: &str,
    input: &str,
    turn: &mut Turn,
) -> Step {
    let Some(node) = menus.get(name).cloned() else {
        warn!(menu = name, "input arrived for unknown menu");
        return Step::con("Menu not available.").with_next(name);
    };

    // 1. Navigation wins over everything else.
    if let Some(target) = navigation_target(&node, input) {
        return Step::next(target);
    }

    // 2. A node-level handler sees the raw input.
    if let Some(handler) = node.handler.as_deref() {
        if let Some(step) = state.registry.invoke(handler, Some(input), state, turn).await {
            return normalise(step, name);
        }
    }

    // 3. Numbered options.
    if let Some(index) = parse_option_index(input, node.options.len()) {
        return select_option(state, name, input, &node.options[index - 1], turn).await;
    }

    // 4. Free-form input.
    if let Some(config) = node.input_config.as_ref() {
        return free_form(state, name, input, config, turn).await;
    }

    Step::invalid(name)
}

/// Exact navigation keys first, then the reserved `"0"`/`"00"`/`"000"`
/// pseudo-keys, then the legacy per-node fields.
fn navigation_target(node: &MenuNode, input: &str) -> Option<String> {
    if let Some(navigation) = node.navigation.as_ref() {
        if let Some(target) = navigation.get(input) {
            return Some(target.clone());
        }
    }

    let reserved = match input {
        "0" => "onBack",
        "00" => "onHome",
        "000" => "onExit",
        _ => return None,
    };
    if let Some(target) = node.navigation.as_ref().and_then(|n| n.get(reserved)) {
        return Some(target.clone());
    }
    match reserved {
        "onBack" => node.on_back.clone(),
        "onHome" => node.on_home.clone(),
        _ => node.on_exit.clone(),
    }
}

fn parse_option_index(input: &str, count: usize) -> Option<usize> {
    let index: usize = input.parse().ok()?;
    (1..=count).contains(&index).then_some(index)
}

async fn select_option(
    state: &AppState,
    name: &str,
    input: &str,
    option: &MenuOption,
    turn: &mut Turn,
) -> Step {
    let context = turn.context();

    if let Some(condition) = &option.condition {
        if !evaluate(condition, &context) {
            return Step::retry(
                name,
                "OPTION_UNAVAILABLE",
                "That option is not available. Please try again.",
            );
        }
    }

    // Store directives: dotted paths resolve against the context, with
    // `storeValue` literals as fallback; literal-only slots work too.
    let mut captures: Vec<(String, Value)> = Vec::new();
    if let Some(directives) = &option.store {
        for (slot, path) in directives {
            let value = resolve_path(&context, path)
                .cloned()
                .or_else(|| option.store_value.as_ref().and_then(|sv| sv.get(slot).cloned()))
                .unwrap_or(Value::Null);
            captures.push((slot.clone(), value));
        }
    }
    if let Some(literals) = &option.store_value {
        for (slot, value) in literals {
            if option.store.as_ref().is_some_and(|s| s.contains_key(slot)) {
                continue;
            }
            captures.push((slot.clone(), value.clone()));
        }
    }
    for (slot, value) in captures {
        if let Err(err) =
            state.sessions.store(&turn.key, &Slot::Named(slot.clone()), &value).await
        {
            warn!(slot = %slot, err = %err, "failed to store option value");
            return Step::retry(
                name,
                "STORE_ERROR",
                "Service temporarily unavailable. Please try again.",
            );
        }
    }

    if let Some(action) = &option.action {
        return run_action(state, name, action, &context, turn).await;
    }

    if let Some(handler) = option.handler.as_deref() {
        if let Some(step) = state.registry.invoke(handler, Some(input), state, turn).await {
            return normalise(step, name);
        }
    }

    match &option.next_menu {
        Some(next) => Step::next(next.clone()),
        None => Step::invalid(name),
    }
}

async fn run_action(
    state: &AppState,
    name: &str,
    action: &ActionSpec,
    context: &Value,
    turn: &mut Turn,
) -> Step {
    let ActionSpec::ApiCall {
        service,
        data,
        cache_key,
        store_key,
        next_menu_on_success,
        next_menu_on_error,
    } = action;

    let data = substitute(data, context);
    let envelope = state
        .upstream
        .call(service, &data, &turn.key, &turn.session, cache_key.as_deref(), false)
        .await;

    if !envelope.success {
        return Step {
            error: Some("API_ERROR".to_owned()),
            error_message: Some(envelope.user_error().to_owned()),
            retry_menu: Some(next_menu_on_error.clone().unwrap_or_else(|| name.to_owned())),
            ..Step::default()
        };
    }

    if let Some(store_key) = store_key {
        if let Err(err) = state
            .sessions
            .store(&turn.key, &Slot::Named(store_key.clone()), &envelope.data)
            .await
        {
            warn!(store_key = %store_key, err = %err, "failed to store api result");
        }
    }
    match next_menu_on_success {
        Some(next) => Step::next(next.clone()),
        None => Step::next(name.to_owned()),
    }
}

async fn free_form(
    state: &AppState,
    name: &str,
    input: &str,
    config: &InputConfig,
    turn: &mut Turn,
) -> Step {
    if let Some(rule) = &config.validation {
        if let Verdict::Fail(message) = check_rule(state, rule, input, turn).await {
            let message = config.error_message.clone().unwrap_or(message);
            return Step::retry(name, "VALIDATION_ERROR", message);
        }
    }

    let value = match config.transform {
        Some(transform) => apply_transform(transform, input),
        None => input.to_owned(),
    };

    if let Some(store_key) = &config.store_key {
        if let Err(err) =
            state.sessions.store(&turn.key, &Slot::Named(store_key.clone()), &value).await
        {
            warn!(store_key = %store_key, err = %err, "failed to store input value");
            return Step::retry(name, "STORE_ERROR", "Service temporarily unavailable. Please try again.");
        }
    }

    if let Some(handler) = config.handler.as_deref() {
        if let Some(step) = state.registry.invoke(handler, Some(&value), state, turn).await {
            return normalise(step, name);
        }
    }

    match &config.next_menu {
        Some(next) => Step::next(next.clone()),
        None => Step::invalid(name),
    }
}

async fn check_rule(
    state: &AppState,
    rule: &ValidationRule,
    input: &str,
    turn: &mut Turn,
) -> Verdict {
    match rule {
        ValidationRule::Pin => {
            if is_valid_pin(input) {
                Verdict::Ok
            } else {
                Verdict::fail("Please enter a valid PIN (4-6 digits).")
            }
        }
        ValidationRule::Msisdn { network } => {
            let valid = match network.as_deref() {
                Some(network) => is_valid_msisdn_for(input, network),
                None => is_valid_msisdn(input),
            };
            if valid {
                Verdict::Ok
            } else {
                Verdict::fail("Please enter a valid mobile number.")
            }
        }
        ValidationRule::Amount { min, max } => validate_amount(input, *min, *max),
        ValidationRule::Date { format } => validate_date(input, format.as_deref()),
        ValidationRule::Choice { allowed } => {
            if allowed.iter().any(|a| a == input) {
                Verdict::Ok
            } else {
                Verdict::fail("Invalid selection. Please try again.")
            }
        }
        ValidationRule::PinOrOption => {
            if input == "1" || is_valid_pin(input) {
                Verdict::Ok
            } else {
                Verdict::fail("Please enter a valid PIN (4-6 digits).")
            }
        }
        ValidationRule::Custom { handler } => {
            match state.registry.invoke(handler, Some(input), state, turn).await {
                Some(step) if step.is_error() => Verdict::Fail(
                    step.error_message
                        .unwrap_or_else(|| "Invalid input. Please try again.".to_owned()),
                ),
                _ => Verdict::Ok,
            }
        }
    }
}

/// Handler results default to `con` and re-prompt the current node when
/// they flag an error without naming a retry target.
fn normalise(mut step: Step, menu: &str) -> Step {
    if step.is_error() && step.retry_menu.is_none() {
        step.retry_menu = Some(menu.to_owned());
    }
    step
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
