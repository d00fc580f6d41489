// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security context propagation adapters
//!
//! Rules scheduled from a request must run as the identity that issued the
//! request, not as whatever identity a worker thread happens to carry. The
//! scheduler captures the identity when a batch is accepted and every rule in
//! the batch runs inside [`SecurityPropagator::run_as`].

mod noop;

pub use noop::NoOpSecurityPropagator;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{active_identity, FakeSecurityPropagator};

use rulerun_core::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant and user a rule executes as
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityIdentity {
    pub tenant: String,
    pub user: String,
}

impl SecurityIdentity {
    pub fn new(tenant: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            user: user.into(),
        }
    }

    /// Identity used when no caller identity is available
    pub fn system() -> Self {
        Self::new("system", "system")
    }
}

impl fmt::Display for SecurityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.tenant)
    }
}

/// Captures and re-establishes the identity rules run under
pub trait SecurityPropagator: Send + Sync + 'static {
    /// Identity of the calling thread
    fn capture(&self) -> SecurityIdentity;

    /// Run `work` with `identity` established, restoring the previous
    /// identity afterwards
    fn run_as(
        &self,
        identity: &SecurityIdentity,
        work: &mut dyn FnMut() -> Result<(), RuleError>,
    ) -> Result<(), RuleError>;
}
