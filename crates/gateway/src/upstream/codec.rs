// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Colon-tuple wire format for the core-banking backend, plus the PII
//! masking applied to anything that reaches a log line.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Statuses the backend uses to signal success.
const SUCCESS_STATUSES: &[&str] = &["000", "00", "0", "OK", "SUCCESS"];

pub fn is_success_status(status: &str) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

/// Map well-known failure statuses to human copy; anything else passes the
/// backend message through.
pub fn failure_message(status: &str, message: &str) -> String {
    match status {
        "091" => "Invalid PIN".to_owned(),
        "092" => "Account locked".to_owned(),
        "093" => "Invalid account".to_owned(),
        _ => message.to_owned(),
    }
}

// -- Tuples -------------------------------------------------------------------

/// Split a `KEY:VALUE:KEY:VALUE:` string into an ordered map, after
/// stripping any tag-like `<...>` wrappers. Odd trailing segments read as
/// empty values; empty keys are dropped.
pub fn parse_tuples(raw: &str) -> IndexMap<String, String> {
    let stripped = strip_tags(raw);
    let segments: Vec<&str> = stripped.split(':').collect();

    let mut map = IndexMap::new();
    let mut index = 0;
    while index < segments.len() {
        let key = segments[index].trim();
        let value = segments.get(index + 1).map(|v| v.trim()).unwrap_or_default();
        if !key.is_empty() {
            map.insert(key.to_owned(), value.to_owned());
        }
        index += 2;
    }
    map
}

/// Render an ordered map as `KEY:VALUE:` tuples. Empty keys and values are
/// dropped: the backend treats an empty field and an absent one the same.
pub fn encode_tuples(map: &IndexMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in map {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        out.push_str(key);
        out.push(':');
        out.push_str(value);
        out.push(':');
    }
    out
}

/// Merge caller-supplied tuples over the base map (caller wins) and encode.
pub fn build_request(mut base: IndexMap<String, String>, extra: &str) -> String {
    for (key, value) in parse_tuples(extra) {
        base.insert(key, value);
    }
    encode_tuples(&base)
}

fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_owned()
}

// -- Envelope -----------------------------------------------------------------

/// Decoded upstream response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub data: IndexMap<String, String>,
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub retry: bool,
}

impl Envelope {
    /// Decode a response body into an envelope.
    pub fn decode(body: &str) -> Self {
        let data = parse_tuples(body);
        let status = data.get("STATUS").cloned().unwrap_or_default();
        let message = data
            .get("DATA")
            .or_else(|| data.get("MESSAGE"))
            .cloned()
            .unwrap_or_default();
        let success = is_success_status(&status);
        let error = (!success).then(|| failure_message(&status, &message));

        Self {
            success,
            status,
            code: None,
            data,
            raw: strip_tags(body),
            message,
            error,
            retry: false,
        }
    }

    /// The envelope returned for transport failures and 5xx answers.
    pub fn connection_error() -> Self {
        Self {
            success: false,
            status: "ERROR".to_owned(),
            code: Some("API_CONNECTION_ERROR".to_owned()),
            data: IndexMap::new(),
            raw: String::new(),
            message: String::new(),
            error: Some("Service temporarily unavailable. Please try again.".to_owned()),
            retry: true,
        }
    }

    /// Message to show the caller on failure, falling back to generic copy.
    pub fn user_error(&self) -> &str {
        match self.error.as_deref() {
            Some(err) if !err.is_empty() => err,
            _ => "Request could not be completed. Please try again.",
        }
    }
}

// -- Masking ------------------------------------------------------------------

/// Pre-compiled log masking patterns. Masking is for log emission only,
/// never for the wire.
pub struct Masker {
    secrets: Regex,
    identifiers: Regex,
}

impl Masker {
    pub fn new() -> anyhow::Result<Self> {
        let secrets = Regex::new(
            r"(?P<key>OLDPIN|NEWPIN|TMPIN|TRXMPIN|LOGINMPIN|PASSWORD|SECRET|PIN):(?P<value>[^:]*)",
        )?;
        // DEVICEID is msisdn+shortcode, so it gets the same treatment.
        let identifiers =
            Regex::new(r"(?P<key>MOBILENUMBER|MSISDN|ACCOUNTID|DEVICEID):(?P<value>[^:]*)")?;
        Ok(Self { secrets, identifiers })
    }

    /// Mask a colon-tuple string for logging.
    pub fn mask(&self, line: &str) -> String {
        let pass = self.secrets.replace_all(line, "${key}:[MASKED]");
        self.identifiers
            .replace_all(&pass, |caps: &regex::Captures<'_>| {
                format!("{}:{}", &caps["key"], mask_identifier(&caps["value"]))
            })
            .into_owned()
    }
}

/// Mask an MSISDN or account id: first three and last three characters
/// survive, the middle is asterisked. Short values pass through.
pub fn mask_identifier(value: &str) -> String {
    if value.len() < 6 {
        return value.to_owned();
    }
    let head: String = value.chars().take(3).collect();
    let tail: String = value.chars().rev().take(3).collect::<Vec<_>>().into_iter().rev().collect();
    let middle = value.chars().count().saturating_sub(6);
    format!("{head}{}{tail}", "*".repeat(middle.max(1)))
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
