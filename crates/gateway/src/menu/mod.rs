// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration-driven menu state machine: node model, rendering, and
//! input processing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod condition;
pub mod loader;
pub mod process;
pub mod render;
pub mod validate;

pub use loader::MenuSet;

/// Whether a frame continues the conversation or ends it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameAction {
    #[default]
    Con,
    End,
}

impl FrameAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Con => "con",
            Self::End => "end",
        }
    }
}

/// The result of a turn: what the aggregator displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub action: FrameAction,
    pub message: String,
}

impl Frame {
    /// The wire form handed back to the aggregator.
    pub fn render_line(&self) -> String {
        format!("{} {}", self.action.as_str(), self.message)
    }
}

/// Normalised outcome of rendering or processing one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub action: FrameAction,
    pub message: Option<String>,
    pub next_menu: Option<String>,
    pub retry_menu: Option<String>,
    pub error: Option<String>,
    pub error_message: Option<String>,
}

impl Step {
    pub fn con(message: impl Into<String>) -> Self {
        Self { action: FrameAction::Con, message: Some(message.into()), ..Self::default() }
    }

    pub fn end(message: impl Into<String>) -> Self {
        Self { action: FrameAction::End, message: Some(message.into()), ..Self::default() }
    }

    /// Route to another node without a message; the turn handler renders it.
    pub fn next(menu: impl Into<String>) -> Self {
        Self { next_menu: Some(menu.into()), ..Self::default() }
    }

    /// A user-input failure that re-prompts `menu`.
    pub fn retry(
        menu: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            action: FrameAction::Con,
            retry_menu: Some(menu.into()),
            error: Some(code.into()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// The default reaction to input no rule claimed.
    pub fn invalid(menu: impl Into<String>) -> Self {
        Self::retry(menu, "INVALID_INPUT", "Invalid selection. Please try again.")
    }

    pub fn with_next(mut self, menu: impl Into<String>) -> Self {
        self.next_menu = Some(menu.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// -- Node model ---------------------------------------------------------------

/// One vertex of the menu state machine, parsed from a per-menu JSON file.
/// Immutable after load; hot reload swaps whole nodes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub options: Vec<MenuOption>,
    #[serde(default)]
    pub input_config: Option<InputConfig>,
    /// Handler invoked before options; on render it receives no input.
    #[serde(default)]
    pub handler: Option<String>,
    /// Literal inputs (plus reserved `onBack`/`onHome`/`onExit`) → menu names.
    #[serde(default)]
    pub navigation: Option<HashMap<String, String>>,
    #[serde(default)]
    pub action: FrameAction,
    /// Displayable footer, e.g. "0 Back  00 Home".
    #[serde(default)]
    pub navigation_hint: Option<String>,
    // Legacy single-field navigation, consulted when the map has no entry.
    #[serde(default)]
    pub on_back: Option<String>,
    #[serde(default)]
    pub on_home: Option<String>,
    #[serde(default)]
    pub on_exit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuOption {
    pub text: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    /// Slot name → dotted context path to capture on selection.
    #[serde(default)]
    pub store: Option<HashMap<String, String>>,
    /// Literal fallbacks when a `store` path resolves to nothing.
    #[serde(default)]
    pub store_value: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub action: Option<ActionSpec>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub next_menu: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ActionSpec {
    ApiCall {
        service: String,
        /// Extra colon tuples; `{dotted.path}` placeholders resolve against
        /// the turn context before the call.
        #[serde(default)]
        data: String,
        #[serde(default)]
        cache_key: Option<String>,
        /// Slot receiving the decoded response map on success.
        #[serde(default)]
        store_key: Option<String>,
        #[serde(default)]
        next_menu_on_success: Option<String>,
        #[serde(default)]
        next_menu_on_error: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    #[serde(default)]
    pub validation: Option<ValidationRule>,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub store_key: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub next_menu: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    Msisdn {
        #[serde(default)]
        network: Option<String>,
    },
    Amount {
        #[serde(default)]
        min: Option<u64>,
        #[serde(default)]
        max: Option<u64>,
    },
    Date {
        #[serde(default)]
        format: Option<String>,
    },
    Pin,
    #[serde(rename = "option")]
    Choice { allowed: Vec<String> },
    PinOrOption,
    Custom { handler: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[serde(rename = "msisdn_to_254")]
    MsisdnTo254,
    #[serde(rename = "msisdn_to_0")]
    MsisdnTo0,
    Uppercase,
    Lowercase,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Exists,
    NotExists,
    Contains,
    In,
}

/// Resolve a dotted path (`customer.firstName`) against a context value.
pub fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
