// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Menu configuration loading and hot reload.
//!
//! The parsed map lives behind a read-mostly pointer; reloads build a new
//! map and swap the pointer only after a successful parse, so in-flight
//! turns keep their snapshot and a half-written file never shows up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use notify::{RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::menu::MenuNode;

pub struct MenuSet {
    dir: PathBuf,
    nodes: RwLock<Arc<HashMap<String, Arc<MenuNode>>>>,
}

impl MenuSet {
    /// Parse every `*.json` file in the directory; the file stem is the
    /// menu name. Startup fails on the first bad file.
    pub fn load(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        let mut nodes = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let (name, node) = parse_menu_file(&path)?;
            nodes.insert(name, Arc::new(node));
        }
        info!(dir = %dir.display(), menus = nodes.len(), "menu configuration loaded");
        Ok(Self { dir, nodes: RwLock::new(Arc::new(nodes)) })
    }

    /// Build a set directly from nodes (tests, fixtures).
    pub fn from_nodes(nodes: HashMap<String, MenuNode>) -> Self {
        let nodes = nodes.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();
        Self { dir: PathBuf::new(), nodes: RwLock::new(Arc::new(nodes)) }
    }

    /// The current parsed map. Turns hold this snapshot for their whole
    /// lifetime; later reloads do not affect them.
    pub fn snapshot(&self) -> Arc<HashMap<String, Arc<MenuNode>>> {
        Arc::clone(&self.nodes.read().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// Re-parse one file and swap it in. A failed parse keeps the
    /// previous node.
    pub fn reload_path(&self, path: &Path) {
        match parse_menu_file(path) {
            Ok((name, node)) => {
                self.swap(|nodes| {
                    nodes.insert(name.clone(), Arc::new(node.clone()));
                });
                info!(menu = %name, "menu reloaded");
            }
            Err(err) => {
                warn!(path = %path.display(), err = %err, "menu reload failed, keeping previous node");
            }
        }
    }

    /// Drop a node whose file went away.
    pub fn remove_path(&self, path: &Path) {
        let Some(name) = menu_name(path) else { return };
        self.swap(|nodes| {
            nodes.remove(&name);
        });
        info!(menu = %name, "menu removed");
    }

    fn swap(&self, mutate: impl Fn(&mut HashMap<String, Arc<MenuNode>>)) {
        let mut guard = self.nodes.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = (**guard).clone();
        mutate(&mut next);
        *guard = Arc::new(next);
    }

    /// Watch the menu directory for changes. The returned watcher must be
    /// kept alive; dropping it stops hot reload.
    pub fn watch(self: &Arc<Self>) -> anyhow::Result<notify::RecommendedWatcher> {
        let set = Arc::clone(self);
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    warn!(err = %err, "menu watcher error");
                    return;
                }
            };
            for path in &event.paths {
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if matches!(event.kind, notify::EventKind::Remove(_)) {
                    set.remove_path(path);
                } else if path.is_file() {
                    set.reload_path(path);
                } else {
                    debug!(path = %path.display(), "ignoring menu event for non-file");
                }
            }
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        info!(dir = %self.dir.display(), "menu hot reload watching");
        Ok(watcher)
    }
}

fn menu_name(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
}

fn parse_menu_file(path: &Path) -> anyhow::Result<(String, MenuNode)> {
    let name = menu_name(path)
        .ok_or_else(|| anyhow::anyhow!("menu file has no usable name: {}", path.display()))?;
    let contents = std::fs::read_to_string(path)?;
    let node: MenuNode = serde_json::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("parsing {}: {err}", path.display()))?;
    Ok((name, node))
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
