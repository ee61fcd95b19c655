// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a state builder over the in-memory KV and
//! a programmable stub upstream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::kv::{Kv, MemoryKv};
use crate::menu::{MenuNode, MenuSet};
use crate::registry::Registry;
use crate::rules::BusinessRules;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::upstream::{ApiEndpoints, UpstreamClient};

/// Canned colon-tuple upstream. Responses are selected by the request's
/// `FORMID`; every request is recorded as its parsed tuple map.
pub struct StubUpstream {
    pub hits: AtomicU32,
    responses: Mutex<HashMap<String, String>>,
    default_body: Mutex<String>,
    pub requests: Mutex<Vec<IndexMap<String, String>>>,
}

impl StubUpstream {
    /// Spawn on an ephemeral port; returns the base URL.
    pub async fn spawn() -> anyhow::Result<(String, Arc<Self>)> {
        let stub = Arc::new(Self {
            hits: AtomicU32::new(0),
            responses: Mutex::new(HashMap::new()),
            default_body: Mutex::new("STATUS:000:".to_owned()),
            requests: Mutex::new(Vec::new()),
        });
        let router =
            Router::new().route("/api", get(Self::handler)).with_state(Arc::clone(&stub));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok((format!("http://{addr}/api"), stub))
    }

    async fn handler(
        State(stub): State<Arc<Self>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> String {
        stub.hits.fetch_add(1, Ordering::SeqCst);
        let tuples =
            crate::upstream::codec::parse_tuples(params.get("b").map(String::as_str).unwrap_or(""));
        let form_id = tuples.get("FORMID").cloned().unwrap_or_default();
        stub.requests.lock().await.push(tuples);

        let responses = stub.responses.lock().await;
        match responses.get(&form_id) {
            Some(body) => body.clone(),
            None => stub.default_body.lock().await.clone(),
        }
    }

    /// Set the body returned for one `FORMID`.
    pub async fn respond_to(&self, form_id: &str, body: &str) {
        self.responses.lock().await.insert(form_id.to_owned(), body.to_owned());
    }

    pub async fn set_default(&self, body: &str) {
        *self.default_body.lock().await = body.to_owned();
    }

    /// Recorded requests carrying the given `FORMID`.
    pub async fn requests_for(&self, form_id: &str) -> Vec<IndexMap<String, String>> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|t| t.get("FORMID").map(String::as_str) == Some(form_id))
            .cloned()
            .collect()
    }
}

/// Everything a test needs to drive the gateway in-process.
pub struct TestCtx {
    pub state: Arc<AppState>,
    pub kv: Arc<MemoryKv>,
    pub upstream: Arc<StubUpstream>,
}

/// Builder for constructing [`AppState`] in tests with sensible defaults.
pub struct StateBuilder {
    menus: HashMap<String, MenuNode>,
    menu_dir: Option<std::path::PathBuf>,
    endpoints: ApiEndpoints,
    rules: BusinessRules,
    config: Config,
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            menus: HashMap::new(),
            menu_dir: None,
            endpoints: ApiEndpoints::default(),
            rules: BusinessRules::default(),
            config: Config::for_tests(),
        }
    }

    /// Load the menu set from a directory of JSON files instead of inline
    /// nodes (end-to-end tests run against the shipped configuration).
    pub fn with_menu_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.menu_dir = Some(dir.into());
        self
    }

    pub fn with_endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_menu(mut self, name: &str, node: MenuNode) -> Self {
        self.menus.insert(name.to_owned(), node);
        self
    }

    pub fn with_menu_json(self, name: &str, json: serde_json::Value) -> anyhow::Result<Self> {
        let node: MenuNode = serde_json::from_value(json)?;
        Ok(self.with_menu(name, node))
    }

    pub fn with_rules(mut self, rules: BusinessRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_config(mut self, mutate: impl FnOnce(&mut Config)) -> Self {
        mutate(&mut self.config);
        self
    }

    pub async fn build(mut self) -> anyhow::Result<TestCtx> {
        let (url, upstream_stub) = StubUpstream::spawn().await?;
        self.config.elma_api_url = url;

        let kv = Arc::new(MemoryKv::new());
        let kv_dyn: Arc<dyn Kv> = Arc::clone(&kv) as Arc<dyn Kv>;
        let sessions = Arc::new(SessionStore::new(
            Arc::clone(&kv_dyn),
            &self.config.redis_session_prefix,
            self.config.redis_ttl,
            &self.config.timezone,
        ));
        let upstream = Arc::new(UpstreamClient::new(
            &self.config,
            self.endpoints,
            Arc::clone(&sessions),
        )?);

        let mut registry = Registry::new();
        crate::modules::register_all(&mut registry);

        let menus = match self.menu_dir {
            Some(dir) => MenuSet::load(dir)?,
            None => MenuSet::from_nodes(self.menus),
        };
        let state = Arc::new(AppState {
            config: self.config,
            kv: kv_dyn,
            sessions,
            upstream,
            registry,
            menus: Arc::new(menus),
            rules: self.rules,
        });
        Ok(TestCtx { state, kv, upstream: upstream_stub })
    }
}
