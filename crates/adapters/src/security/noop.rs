// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security propagator for single-tenant deployments.

use super::{SecurityIdentity, SecurityPropagator};
use rulerun_core::RuleError;

/// Propagator that always reports one fixed identity and establishes nothing.
#[derive(Clone, Debug)]
pub struct NoOpSecurityPropagator {
    identity: SecurityIdentity,
}

impl NoOpSecurityPropagator {
    pub fn new() -> Self {
        Self::with_identity(SecurityIdentity::system())
    }

    pub fn with_identity(identity: SecurityIdentity) -> Self {
        Self { identity }
    }
}

impl Default for NoOpSecurityPropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityPropagator for NoOpSecurityPropagator {
    fn capture(&self) -> SecurityIdentity {
        self.identity.clone()
    }

    fn run_as(
        &self,
        _identity: &SecurityIdentity,
        work: &mut dyn FnMut() -> Result<(), RuleError>,
    ) -> Result<(), RuleError> {
        work()
    }
}
