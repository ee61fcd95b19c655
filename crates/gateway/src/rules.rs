// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Business rule artefact, consumed after parse from
//! `business-rules.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtimeRules {
    pub min_amount: u64,
    pub max_amount: u64,
    /// Aggregate purchase ceiling per MSISDN per calendar day.
    pub daily_limit: u64,
}

impl Default for AirtimeRules {
    fn default() -> Self {
        Self { min_amount: 10, max_amount: 5000, daily_limit: 10_000 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRules {
    #[serde(default)]
    pub airtime: AirtimeRules,
}

impl BusinessRules {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
