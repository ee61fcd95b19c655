// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::config::Config;
use crate::kv::Kv;
use crate::menu::MenuSet;
use crate::registry::Registry;
use crate::rules::BusinessRules;
use crate::session::SessionStore;
use crate::upstream::UpstreamClient;

/// Shared gateway state. The registry and rules are frozen after init;
/// the menu set is read-mostly and swapped atomically on hot reload.
pub struct AppState {
    pub config: Config,
    pub kv: Arc<dyn Kv>,
    pub sessions: Arc<SessionStore>,
    pub upstream: Arc<UpstreamClient>,
    pub registry: Registry,
    pub menus: Arc<MenuSet>,
    pub rules: BusinessRules,
}
