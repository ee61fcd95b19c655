// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failure taxonomy for the gateway.
///
/// Only `InvalidRequest` may surface as a non-200 response. Every other
/// kind is converted by the turn handler into a well-formed USSD `con` or
/// `end` frame; the telco channel cannot display HTTP errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed request fields.
    InvalidRequest,
    /// The KV cluster or the upstream backend is unreachable.
    Unavailable,
    /// The backend answered with a failure status.
    UpstreamDenied,
    /// User input failed a validation rule.
    Validation,
    /// Unknown menu name.
    NotFound,
    /// Anything unexpected.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Unavailable => "UNAVAILABLE",
            Self::UpstreamDenied => "UPSTREAM_DENIED",
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }

    /// User-safe fallback copy when a module supplies nothing better.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid parameters",
            Self::Unavailable => "Service temporarily unavailable. Please try again.",
            Self::UpstreamDenied => "Request could not be completed. Please try again.",
            Self::Validation => "Invalid selection. Please try again.",
            Self::NotFound => "Menu not available.",
            Self::Internal => "Service temporarily unavailable. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
