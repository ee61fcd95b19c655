// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response plumbing for the core-banking backend.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod client;
pub mod codec;

pub use client::UpstreamClient;
pub use codec::{Envelope, Masker};

/// Logical service name → `FORMID` map, loaded from `api-endpoints.json`.
/// Unmapped services pass through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoints {
    #[serde(default)]
    pub services: HashMap<String, String>,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        // The balance rail uses a short form id on the wire.
        let services =
            HashMap::from([("BALANCE".to_owned(), "B-".to_owned())]);
        Self { services }
    }
}

impl ApiEndpoints {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn form_id<'a>(&'a self, service: &'a str) -> &'a str {
        self.services.get(service).map(String::as_str).unwrap_or(service)
    }
}
