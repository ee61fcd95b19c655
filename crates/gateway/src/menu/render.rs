// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn a menu node into a displayable frame.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::menu::condition::evaluate;
use crate::menu::{resolve_path, MenuNode, Step};
use crate::state::AppState;
use crate::turn::Turn;

/// Terminal copy for the synthetic `end` menu.
const FAREWELL: &str = "Thank you for using our service. Goodbye.";

/// Render a node to a step. Unknown menus degrade to a friendly frame
/// instead of failing the turn.
pub async fn render(
    state: &AppState,
    menus: &HashMap<String, Arc<MenuNode>>,
    name: &str,
    turn: &mut Turn,
) -> Step {
    if name == "end" {
        return Step::end(FAREWELL);
    }

    let Some(node) = menus.get(name).cloned() else {
        warn!(menu = name, "menu not found in configuration");
        return Step::con("Menu not available.").with_next(name);
    };

    // A node handler renders dynamic content; it runs once per turn even
    // if the same node is re-rendered after processing.
    if let Some(handler) = node.handler.as_deref() {
        if turn.mark_handler(name) {
            if let Some(step) = state.registry.invoke(handler, None, state, turn).await {
                if step.message.is_some() || step.error_message.is_some() {
                    return step;
                }
            }
        }
    }

    let context = turn.context();
    let mut text = substitute(&node.message, &context);

    for (index, option) in node.options.iter().enumerate() {
        if let Some(condition) = &option.condition {
            if !evaluate(condition, &context) {
                continue;
            }
        }
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&format!("{}. {}", index + 1, substitute(&option.text, &context)));
    }

    if let Some(hint) = node.navigation_hint.as_deref() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(hint);
    }

    Step {
        action: node.action,
        message: Some(text.trim_end().to_owned()),
        ..Step::default()
    }
}

/// Replace `{dotted.path}` placeholders with context values; anything
/// unresolved renders as empty.
pub fn substitute(template: &str, context: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_path(&after[..close]) => {
                if let Some(value) = resolve_path(context, &after[..close]) {
                    out.push_str(&value_text(value));
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_path(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
