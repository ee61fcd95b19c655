// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action module registry: a frozen map of namespaced handler names to
//! dispatchable objects, with an alias table for the short names menu
//! configuration uses.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, warn};

use crate::menu::Step;
use crate::state::AppState;
use crate::turn::Turn;

/// One dispatchable action-module method.
///
/// Returning `Ok(None)` declines the input and lets the engine fall
/// through to the node's own routing.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> anyhow::Result<Option<Step>>;
}

/// Name → handler map, frozen after init. Lookup consults aliases first,
/// then direct names; the hot path never reflects.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    aliases: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under a namespaced `{module}.{method}` name.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn Handler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!(name = %name, "handler registered twice, last one wins");
        }
    }

    /// Map a short name onto a namespaced one.
    pub fn alias(&mut self, short: impl Into<String>, full: impl Into<String>) {
        self.aliases.insert(short.into(), full.into());
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        let resolved = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.handlers.get(resolved).cloned()
    }

    /// Dispatch to a handler by name. A missing handler or a handler error
    /// both come back as the uniform failure step so a broken module can
    /// never take the whole turn down.
    pub async fn invoke(
        &self,
        name: &str,
        input: Option<&str>,
        state: &AppState,
        turn: &mut Turn,
    ) -> Option<Step> {
        let Some(handler) = self.lookup(name) else {
            warn!(handler = name, "menu references unknown handler");
            return Some(failure_step());
        };
        match handler.handle(input, state, turn).await {
            Ok(step) => step,
            Err(err) => {
                error!(handler = name, err = %err, "handler failed");
                Some(failure_step())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn failure_step() -> Step {
    Step {
        action: crate::menu::FrameAction::Con,
        error: Some("HANDLER_ERROR".to_owned()),
        error_message: Some("Service temporarily unavailable. Please try again.".to_owned()),
        ..Step::default()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
