// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input validation rules and transforms for free-form menu input.

use chrono::{Duration, NaiveDate, Utc};

use crate::menu::Transform;

/// Outcome of a validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Fail(String),
}

impl Verdict {
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// 4–6 ASCII digits.
pub fn is_valid_pin(input: &str) -> bool {
    (4..=6).contains(&input.len()) && input.bytes().all(|b| b.is_ascii_digit())
}

/// Local-form MSISDN: 10 digits starting 07 or 01.
pub fn is_valid_local_msisdn(input: &str) -> bool {
    input.len() == 10
        && input.bytes().all(|b| b.is_ascii_digit())
        && (input.starts_with("07") || input.starts_with("01"))
}

/// Either the local form or the 254-prefixed international form.
pub fn is_valid_msisdn(input: &str) -> bool {
    if is_valid_local_msisdn(input) {
        return true;
    }
    input.len() == 12
        && input.bytes().all(|b| b.is_ascii_digit())
        && (input.starts_with("2547") || input.starts_with("2541"))
}

/// Network-qualified MSISDN check. Safaricom and Airtel span both the 07
/// and 01 ranges; Telkom numbers only use 07.
pub fn is_valid_msisdn_for(input: &str, network: &str) -> bool {
    if !is_valid_msisdn(input) {
        return false;
    }
    let local = msisdn_to_0(input);
    match network.to_lowercase().as_str() {
        "telkom" => local.starts_with("07"),
        _ => true,
    }
}

/// Normalise to the international `254...` form.
pub fn msisdn_to_254(input: &str) -> String {
    match input.strip_prefix('0') {
        Some(rest) if input.len() == 10 => format!("254{rest}"),
        _ => input.to_owned(),
    }
}

/// Normalise to the local `0...` form.
pub fn msisdn_to_0(input: &str) -> String {
    match input.strip_prefix("254") {
        Some(rest) if input.len() == 12 => format!("0{rest}"),
        _ => input.to_owned(),
    }
}

/// Amount within optional bounds.
pub fn validate_amount(input: &str, min: Option<u64>, max: Option<u64>) -> Verdict {
    let Ok(amount) = input.trim().parse::<u64>() else {
        return Verdict::fail("Please enter a valid amount.");
    };
    if let Some(min) = min {
        if amount < min {
            return Verdict::fail(format!("Minimum amount is {min}."));
        }
    }
    if let Some(max) = max {
        if amount > max {
            return Verdict::fail(format!("Maximum amount is {max}."));
        }
    }
    Verdict::Ok
}

/// Date in `DDMMYYYY` (or a caller-supplied chrono format), not in the
/// future and not older than ten years.
pub fn validate_date(input: &str, format: Option<&str>) -> Verdict {
    let format = format.unwrap_or("%d%m%Y");
    let Ok(date) = NaiveDate::parse_from_str(input.trim(), format) else {
        return Verdict::fail("Please enter a valid date (DDMMYYYY).");
    };
    let today = Utc::now().date_naive();
    if date > today {
        return Verdict::fail("Date cannot be in the future.");
    }
    if date < today - Duration::days(365 * 10) {
        return Verdict::fail("Date is too far in the past.");
    }
    Verdict::Ok
}

/// Apply a configured transform.
pub fn apply_transform(transform: Transform, input: &str) -> String {
    match transform {
        Transform::MsisdnTo254 => msisdn_to_254(input),
        Transform::MsisdnTo0 => msisdn_to_0(input),
        Transform::Uppercase => input.to_uppercase(),
        Transform::Lowercase => input.to_lowercase(),
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
