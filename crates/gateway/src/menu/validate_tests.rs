// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{Duration, Utc};

use crate::menu::validate::{
    apply_transform, is_valid_local_msisdn, is_valid_msisdn, is_valid_msisdn_for, is_valid_pin,
    msisdn_to_0, msisdn_to_254, validate_amount, validate_date, Verdict,
};
use crate::menu::Transform;

#[yare::parameterized(
    four        = { "1234", true },
    six         = { "123456", true },
    three       = { "123", false },
    seven       = { "1234567", false },
    letters     = { "12a4", false },
    unicode     = { "١٢٣٤", false },
)]
fn pin_shape(input: &str, ok: bool) {
    assert_eq!(is_valid_pin(input), ok);
}

#[yare::parameterized(
    safaricom  = { "0712345678", true },
    airtel_01  = { "0112345678", true },
    too_short  = { "071234567", false },
    wrong_net  = { "0212345678", false },
    intl_form  = { "254712345678", false },
)]
fn local_msisdn(input: &str, ok: bool) {
    assert_eq!(is_valid_local_msisdn(input), ok);
}

#[yare::parameterized(
    local      = { "0712345678", true },
    intl       = { "254712345678", true },
    intl_01    = { "254112345678", true },
    bad_prefix = { "254912345678", false },
    garbage    = { "hello", false },
)]
fn general_msisdn(input: &str, ok: bool) {
    assert_eq!(is_valid_msisdn(input), ok);
}

#[test]
fn telkom_rejects_01_range() {
    assert!(is_valid_msisdn_for("0712345678", "telkom"));
    assert!(!is_valid_msisdn_for("0112345678", "telkom"));
    assert!(is_valid_msisdn_for("0112345678", "airtel"));
}

#[test]
fn safaricom_spans_both_ranges() {
    assert!(is_valid_msisdn_for("0712345678", "safaricom"));
    assert!(is_valid_msisdn_for("0112345678", "safaricom"));
    assert!(!is_valid_msisdn_for("0212345678", "safaricom"));
}

#[yare::parameterized(
    to_254       = { Transform::MsisdnTo254, "0712345678", "254712345678" },
    to_254_noop  = { Transform::MsisdnTo254, "254712345678", "254712345678" },
    to_0         = { Transform::MsisdnTo0, "254712345678", "0712345678" },
    to_0_noop    = { Transform::MsisdnTo0, "0712345678", "0712345678" },
    upper        = { Transform::Uppercase, "yes", "YES" },
    lower        = { Transform::Lowercase, "NO", "no" },
)]
fn transforms(transform: Transform, input: &str, expected: &str) {
    assert_eq!(apply_transform(transform, input), expected);
}

#[yare::parameterized(
    in_range  = { "100", Some(10), Some(5000), true },
    at_min    = { "10", Some(10), Some(5000), true },
    below_min = { "9", Some(10), Some(5000), false },
    above_max = { "5001", Some(10), Some(5000), false },
    unbounded = { "999999", None, None, true },
    not_a_number = { "ten", None, None, false },
    negative  = { "-5", Some(1), None, false },
)]
fn amounts(input: &str, min: Option<u64>, max: Option<u64>, ok: bool) {
    assert_eq!(validate_amount(input, min, max).is_ok(), ok);
}

#[test]
fn date_accepts_recent_past_only() {
    let yesterday = (Utc::now().date_naive() - Duration::days(1)).format("%d%m%Y").to_string();
    assert!(validate_date(&yesterday, None).is_ok());

    let tomorrow = (Utc::now().date_naive() + Duration::days(1)).format("%d%m%Y").to_string();
    assert!(!validate_date(&tomorrow, None).is_ok());

    let ancient = (Utc::now().date_naive() - Duration::days(365 * 11)).format("%d%m%Y").to_string();
    assert!(!validate_date(&ancient, None).is_ok());

    assert!(!validate_date("31132020", None).is_ok());
    assert!(matches!(validate_date("junk", None), Verdict::Fail(_)));
}
