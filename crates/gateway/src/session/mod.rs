// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state persisted across USSD turns, keyed by
//! (MSISDN, session id, shortcode).

use std::borrow::Cow;

use chrono::{FixedOffset, Utc};
use serde::{Deserialize, Serialize};

pub mod store;

pub use store::SessionStore;

/// The composite key identifying one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub msisdn: String,
    pub session_id: String,
    pub shortcode: Option<String>,
}

impl SessionKey {
    pub fn new(
        msisdn: impl Into<String>,
        session_id: impl Into<String>,
        shortcode: Option<String>,
    ) -> Self {
        Self { msisdn: msisdn.into(), session_id: session_id.into(), shortcode }
    }

    /// The shortcode segment of the storage key.
    pub fn shortcode_segment(&self) -> &str {
        self.shortcode.as_deref().filter(|s| !s.is_empty()).unwrap_or("default")
    }
}

/// Authentication state of the caller within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    Pending,
    Authenticated,
}

/// Customer record fetched from the backend on the first `home` turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    pub customer_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CustomerData {
    /// Fallback identity when the customer lookup fails.
    pub fn guest() -> Self {
        Self {
            customer_id: "GUEST".to_owned(),
            first_name: "Customer".to_owned(),
            last_name: String::new(),
            language: "en".to_owned(),
            accounts: Vec::new(),
            aliases: Vec::new(),
            id_number: None,
            email: None,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.customer_id == "GUEST"
    }
}

/// The session blob, serialized as JSON under the composite key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub current_menu: String,
    #[serde(default)]
    pub menu_history: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_data: Option<CustomerData>,
    #[serde(default)]
    pub auth_status: AuthStatus,
    #[serde(default)]
    pub transaction_count: u32,
    pub session_start: String,
    pub last_activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transaction: Option<String>,
    /// Monotonic anchor for elapsed-time computation. Never rewritten.
    pub created_at_millis: u64,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.auth_status == AuthStatus::Authenticated
    }

    /// Accounts of the authenticated customer, empty before login.
    pub fn accounts(&self) -> &[String] {
        self.customer_data.as_ref().map(|c| c.accounts.as_slice()).unwrap_or_default()
    }
}

/// Named auxiliary values attached to a session under
/// `<sessionKey>:<slotName>`, with the session's TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    PinAttempt,
    LoginData,
    BalanceSelectedAccount,
    StatementAccount,
    Network,
    MerchantId,
    AirtimeAmount,
    AirtimeMode,
    AirtimeRecipient,
    TransactionPin,
    PinRedirect,
    /// Per-session upstream response cache, one entry per cache key.
    ApiCache(String),
    /// A `storeKey`/`store` target from menu configuration.
    Named(String),
}

impl Slot {
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Self::PinAttempt => Cow::Borrowed("pin_attempt"),
            Self::LoginData => Cow::Borrowed("login_data"),
            Self::BalanceSelectedAccount => Cow::Borrowed("balance_selected_account"),
            Self::StatementAccount => Cow::Borrowed("statement_account"),
            Self::Network => Cow::Borrowed("network"),
            Self::MerchantId => Cow::Borrowed("merchant_id"),
            Self::AirtimeAmount => Cow::Borrowed("airtime_amount"),
            Self::AirtimeMode => Cow::Borrowed("airtime_mode"),
            Self::AirtimeRecipient => Cow::Borrowed("airtime_recipient"),
            Self::TransactionPin => Cow::Borrowed("transaction_pin"),
            Self::PinRedirect => Cow::Borrowed("pin_redirect"),
            Self::ApiCache(key) => Cow::Owned(format!("api_cache_{key}")),
            Self::Named(name) => Cow::Borrowed(name),
        }
    }
}

// -- Time helpers -------------------------------------------------------------

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Resolve a timezone knob to a fixed offset. Supported named zones are the
/// no-DST East-Africa ones the gateway deploys in; `"+HH:MM"` is accepted
/// verbatim.
pub fn offset_for(timezone: &str) -> Option<FixedOffset> {
    let east_africa = [
        "Africa/Nairobi",
        "Africa/Kampala",
        "Africa/Dar_es_Salaam",
        "Africa/Mogadishu",
        "Africa/Addis_Ababa",
        "Africa/Djibouti",
    ];
    if east_africa.contains(&timezone) {
        return FixedOffset::east_opt(3 * 3600);
    }
    if timezone.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = if let Some(rest) = timezone.strip_prefix('+') {
        (1i32, rest)
    } else if let Some(rest) = timezone.strip_prefix('-') {
        (-1i32, rest)
    } else {
        return None;
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Wall-clock timestamp string in the given offset.
pub fn now_stamp(offset: FixedOffset) -> String {
    Utc::now().with_timezone(&offset).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
