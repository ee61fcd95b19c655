// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Option visibility conditions evaluated against the turn context.

use serde_json::Value;

use crate::menu::{resolve_path, Condition, Operator};

/// Evaluate a condition. Missing fields satisfy `not_exists` only.
pub fn evaluate(condition: &Condition, context: &Value) -> bool {
    let field = resolve_path(context, &condition.field);

    match condition.operator {
        Operator::Exists => field.is_some_and(|v| !v.is_null()),
        Operator::NotExists => !field.is_some_and(|v| !v.is_null()),
        Operator::Equals => match (field, condition.value.as_ref()) {
            (Some(found), Some(expected)) => loose_eq(found, expected),
            _ => false,
        },
        Operator::NotEquals => match (field, condition.value.as_ref()) {
            (Some(found), Some(expected)) => !loose_eq(found, expected),
            // An absent field is not equal to anything.
            (None, Some(_)) => true,
            _ => false,
        },
        Operator::GreaterThan => compare(field, condition.value.as_ref())
            .is_some_and(|ordering| ordering == std::cmp::Ordering::Greater),
        Operator::LessThan => compare(field, condition.value.as_ref())
            .is_some_and(|ordering| ordering == std::cmp::Ordering::Less),
        Operator::Contains => match (field, condition.value.as_ref()) {
            (Some(Value::String(haystack)), Some(needle)) => {
                haystack.contains(as_text(needle).as_str())
            }
            (Some(Value::Array(items)), Some(needle)) => items.iter().any(|i| loose_eq(i, needle)),
            _ => false,
        },
        Operator::In => match (field, condition.value.as_ref()) {
            (Some(found), Some(Value::Array(allowed))) => {
                allowed.iter().any(|candidate| loose_eq(found, candidate))
            }
            _ => false,
        },
    }
}

/// Equality with string/number coercion: `"5" == 5`.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => as_text(a) == as_text(b),
    }
}

fn compare(field: Option<&Value>, expected: Option<&Value>) -> Option<std::cmp::Ordering> {
    let lhs = as_number(field?)?;
    let rhs = as_number(expected?)?;
    lhs.partial_cmp(&rhs)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
