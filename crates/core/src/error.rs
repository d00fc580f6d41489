// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised while executing a rule

use thiserror::Error;

/// Why a rule did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("rule failed: {0}")]
    Failed(String),
    #[error("rule panicked: {0}")]
    Panicked(String),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("security context error: {0}")]
    Security(String),
}

impl RuleError {
    pub fn failed(message: impl Into<String>) -> Self {
        RuleError::Failed(message.into())
    }

    /// Build from a payload caught by `std::panic::catch_unwind`
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        RuleError::Panicked(message)
    }
}
