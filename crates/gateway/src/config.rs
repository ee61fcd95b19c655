// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// USSD session gateway for a mobile banking shortcode.
#[derive(Debug, Clone, Parser)]
#[command(name = "ussdgw", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "USSD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "USSD_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Redis host.
    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1")]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Redis password, if the cluster requires one.
    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    /// Session TTL in seconds.
    #[arg(long, env = "REDIS_TTL", default_value_t = 300)]
    pub redis_ttl: u64,

    /// Key prefix for session records.
    #[arg(long, env = "REDIS_SESSION_PREFIX", default_value = "ussd:session")]
    pub redis_session_prefix: String,

    /// How long KV operations wait for the cluster to become ready, in milliseconds.
    #[arg(long, env = "REDIS_READY_TIMEOUT", default_value_t = 10000)]
    pub redis_ready_timeout_ms: u64,

    /// Base URL of the core-banking backend.
    #[arg(long, env = "ELMA_API_URL", default_value = "")]
    pub elma_api_url: String,

    /// Overall upstream request timeout in milliseconds.
    #[arg(long, env = "API_TIMEOUT", default_value_t = 25000)]
    pub api_timeout_ms: u64,

    /// Upstream connect timeout in milliseconds.
    #[arg(long, env = "API_CONNECT_TIMEOUT", default_value_t = 15000)]
    pub api_connect_timeout_ms: u64,

    /// Bank identifier sent with every upstream request.
    #[arg(long, env = "BANK_ID", default_value = "")]
    pub bank_id: String,

    /// Bank display name sent with every upstream request.
    #[arg(long, env = "BANK_NAME", default_value = "")]
    pub bank_name: String,

    /// Default shortcode when the aggregator omits one.
    #[arg(long, env = "ELMA_SHORTCODE", default_value = "")]
    pub elma_shortcode: String,

    /// Country code sent with every upstream request.
    #[arg(long, env = "COUNTRY", default_value = "KE")]
    pub country: String,

    /// Transaction source tag.
    #[arg(long, env = "TRX_SOURCE", default_value = "USSD")]
    pub trx_source: String,

    /// Timezone for session timestamps (named zone or "+HH:MM").
    #[arg(long, env = "TIMEZONE", default_value = "Africa/Nairobi")]
    pub timezone: String,

    /// PIN transport encryption key.
    #[arg(long, env = "ENCRYPTION_KEY")]
    pub encryption_key: Option<String>,

    /// PIN transport IV.
    #[arg(long, env = "IV_KEY")]
    pub iv_key: Option<String>,

    /// Accept wire PINs as plain text (test scaffolding only).
    #[arg(long, env = "USSD_PLAIN_PIN")]
    pub plain_pin: bool,

    /// Directory of per-menu JSON files.
    #[arg(long, env = "USSD_MENU_DIR", default_value = "config/menus")]
    pub menu_dir: PathBuf,

    /// Service name → form id map.
    #[arg(long, env = "USSD_API_ENDPOINTS", default_value = "config/api-endpoints.json")]
    pub api_endpoints: PathBuf,

    /// Business rule artefact (amount limits etc).
    #[arg(long, env = "USSD_BUSINESS_RULES", default_value = "config/business-rules.json")]
    pub business_rules: PathBuf,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.elma_api_url.is_empty() {
            anyhow::bail!("--elma-api-url (ELMA_API_URL) must be specified");
        }
        if self.bank_id.is_empty() {
            anyhow::bail!("--bank-id (BANK_ID) must be specified");
        }
        if self.bank_name.is_empty() {
            anyhow::bail!("--bank-name (BANK_NAME) must be specified");
        }
        if self.redis_ttl == 0 {
            anyhow::bail!("--redis-ttl must be at least 1 second");
        }

        // Production deployments carry the transport key material even though
        // decryption happens upstream; --plain-pin is the reserved escape
        // hatch for test scaffolding.
        if !self.plain_pin {
            if self.encryption_key.as_deref().unwrap_or("").is_empty() {
                anyhow::bail!("ENCRYPTION_KEY must be set unless --plain-pin is given");
            }
            if self.iv_key.as_deref().unwrap_or("").is_empty() {
                anyhow::bail!("IV_KEY must be set unless --plain-pin is given");
            }
        }

        Ok(())
    }

    /// Redis connection URL for the `redis` crate.
    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(pw) if !pw.is_empty() => {
                format!("redis://:{}@{}:{}/", pw, self.redis_host, self.redis_port)
            }
            _ => format!("redis://{}:{}/", self.redis_host, self.redis_port),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn api_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.api_connect_timeout_ms)
    }

    pub fn redis_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_ready_timeout_ms)
    }

    /// A configuration suitable for tests: in-memory collaborators, plain PINs.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            redis_host: "127.0.0.1".into(),
            redis_port: 6379,
            redis_password: None,
            redis_ttl: 300,
            redis_session_prefix: "ussd:session".into(),
            redis_ready_timeout_ms: 10000,
            elma_api_url: "http://127.0.0.1:0".into(),
            api_timeout_ms: 25000,
            api_connect_timeout_ms: 15000,
            bank_id: "057".into(),
            bank_name: "SIDIAN".into(),
            elma_shortcode: "527".into(),
            country: "KE".into(),
            trx_source: "USSD".into(),
            timezone: "Africa/Nairobi".into(),
            encryption_key: None,
            iv_key: None,
            plain_pin: true,
            menu_dir: "config/menus".into(),
            api_endpoints: "config/api-endpoints.json".into(),
            business_rules: "config/business-rules.json".into(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
