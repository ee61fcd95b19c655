// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-call RPC client for the core-banking backend, with a
//! per-(MSISDN, session) response cache held in session slots.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::session::{epoch_ms, Session, SessionKey, SessionStore, Slot};
use crate::upstream::codec::{build_request, Envelope, Masker};
use crate::upstream::ApiEndpoints;

/// How long a cached envelope stays fresh.
const CACHE_FRESH_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedEnvelope {
    envelope: Envelope,
    cached_at_millis: u64,
}

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    bank_id: String,
    bank_name: String,
    default_shortcode: String,
    country: String,
    trx_source: String,
    endpoints: ApiEndpoints,
    sessions: Arc<SessionStore>,
    masker: Masker,
}

impl UpstreamClient {
    pub fn new(
        config: &Config,
        endpoints: ApiEndpoints,
        sessions: Arc<SessionStore>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.api_connect_timeout())
            .timeout(config.api_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.elma_api_url.clone(),
            bank_id: config.bank_id.clone(),
            bank_name: config.bank_name.clone(),
            default_shortcode: config.elma_shortcode.clone(),
            country: config.country.clone(),
            trx_source: config.trx_source.clone(),
            endpoints,
            sessions,
            masker: Masker::new()?,
        })
    }

    fn effective_shortcode(&self, key: &SessionKey) -> String {
        key.shortcode
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_shortcode)
            .to_owned()
    }

    fn base_tuples(
        &self,
        form_id: &str,
        key: &SessionKey,
        session: &Session,
    ) -> IndexMap<String, String> {
        let shortcode = self.effective_shortcode(key);
        let mut base = IndexMap::new();
        base.insert("FORMID".to_owned(), form_id.to_owned());
        base.insert("MOBILENUMBER".to_owned(), key.msisdn.clone());
        base.insert("SESSION".to_owned(), key.session_id.clone());
        base.insert("BANKID".to_owned(), self.bank_id.clone());
        base.insert("BANKNAME".to_owned(), self.bank_name.clone());
        base.insert("SHORTCODE".to_owned(), shortcode.clone());
        base.insert("COUNTRY".to_owned(), self.country.clone());
        base.insert("TRXSOURCE".to_owned(), self.trx_source.clone());
        base.insert("DEVICEID".to_owned(), format!("{}{}", key.msisdn, shortcode));
        base.insert("UNIQUEID".to_owned(), uuid::Uuid::new_v4().to_string());

        if let Some(customer) = session.customer_data.as_ref().filter(|c| !c.is_guest()) {
            base.insert("CUSTOMERID".to_owned(), customer.customer_id.clone());
            if !customer.accounts.is_empty() {
                base.insert("BANKACCOUNTS".to_owned(), customer.accounts.join(","));
            }
        }
        base
    }

    /// One upstream round trip. Transport failures and 5xx answers come
    /// back as a retryable error envelope, never as `Err`.
    pub async fn call(
        &self,
        service: &str,
        data: &str,
        key: &SessionKey,
        session: &Session,
        cache_key: Option<&str>,
        force_refresh: bool,
    ) -> Envelope {
        if let Some(cache_key) = cache_key.filter(|_| !force_refresh) {
            let slot = Slot::ApiCache(cache_key.to_owned());
            if let Ok(Some(cached)) = self.sessions.grab::<CachedEnvelope>(key, &slot).await {
                if epoch_ms().saturating_sub(cached.cached_at_millis) <= CACHE_FRESH_MS {
                    debug!(service, cache_key, "serving upstream response from session cache");
                    return cached.envelope;
                }
            }
        }

        let form_id = self.endpoints.form_id(service);
        let request = build_request(self.base_tuples(form_id, key, session), data);
        debug!(service, request = %self.masker.mask(&request), "upstream request");

        let envelope = match self.http.get(&self.base_url).query(&[("b", &request)]).send().await {
            Ok(resp) if resp.status().is_server_error() => {
                warn!(service, status = %resp.status(), "upstream server error");
                Envelope::connection_error()
            }
            // 4xx bodies are normal colon-tuple responses.
            Ok(resp) => match resp.text().await {
                Ok(body) => Envelope::decode(&body),
                Err(err) => {
                    warn!(service, err = %err, "upstream body read failed");
                    Envelope::connection_error()
                }
            },
            Err(err) => {
                warn!(service, err = %err, "upstream transport error");
                Envelope::connection_error()
            }
        };

        if envelope.success {
            if let Some(cache_key) = cache_key {
                let slot = Slot::ApiCache(cache_key.to_owned());
                let cached =
                    CachedEnvelope { envelope: envelope.clone(), cached_at_millis: epoch_ms() };
                if let Err(err) = self.sessions.store(key, &slot, &cached).await {
                    debug!(cache_key, err = %err, "failed to cache upstream response");
                }
            }
        }
        envelope
    }

    // -- Typed calls ----------------------------------------------------------

    /// Customer lookup, cached per MSISDN for the session.
    pub async fn get_customer(&self, key: &SessionKey, session: &Session) -> Envelope {
        let data = format!("MOBILENUMBER:{}:", key.msisdn);
        let cache_key = format!("customer_{}", key.msisdn);
        self.call("GETCUSTOMER", &data, key, session, Some(&cache_key), false).await
    }

    /// PIN verification. Never cached.
    pub async fn login(
        &self,
        key: &SessionKey,
        session: &Session,
        customer_id: &str,
        pin: &str,
    ) -> Envelope {
        let data = format!("LOGINMPIN:{pin}:CUSTOMERID:{customer_id}:");
        self.call("LOGIN", &data, key, session, None, false).await
    }

    /// Balance query for one account. Never cached.
    pub async fn balance(
        &self,
        key: &SessionKey,
        session: &Session,
        customer_id: &str,
        account: &str,
    ) -> Envelope {
        let data = format!(
            "MERCHANTID:BALANCE:BANKACCOUNTID:{account}:CUSTOMERID:{customer_id}:MOBILENUMBER:{}:",
            key.msisdn
        );
        self.call("BALANCE", &data, key, session, None, false).await
    }

    /// Mini-statement for one account.
    pub async fn mini_statement(
        &self,
        key: &SessionKey,
        session: &Session,
        customer_id: &str,
        account: &str,
    ) -> Envelope {
        let data = format!(
            "MERCHANTID:STATEMENT:BANKACCOUNTID:{account}:CUSTOMERID:{customer_id}:MOBILENUMBER:{}:",
            key.msisdn
        );
        self.call("MINISTATEMENT", &data, key, session, None, false).await
    }

    /// Airtime purchase via the paybill rail.
    #[allow(clippy::too_many_arguments)]
    pub async fn airtime_purchase(
        &self,
        key: &SessionKey,
        session: &Session,
        merchant_id: &str,
        bank_account_id: &str,
        mobile_number: &str,
        amount: u64,
        pin: &str,
    ) -> Envelope {
        let data = format!(
            "ACTION:PAYBILL:MERCHANTID:{merchant_id}:BANKACCOUNTID:{bank_account_id}:\
             MOBILENUMBER:{mobile_number}:AMOUNT:{amount}:TRXMPIN:{pin}:"
        );
        self.call("PAYBILL", &data, key, session, None, false).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
