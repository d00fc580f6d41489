// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake security propagator for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SecurityIdentity, SecurityPropagator};
use rulerun_core::RuleError;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

thread_local! {
    static ACTIVE: RefCell<Option<SecurityIdentity>> = const { RefCell::new(None) };
}

/// Identity established on the current thread by a [`FakeSecurityPropagator`]
pub fn active_identity() -> Option<SecurityIdentity> {
    ACTIVE.with(|active| active.borrow().clone())
}

/// Fake propagator with a settable caller identity and a deny list
#[derive(Clone)]
pub struct FakeSecurityPropagator {
    caller: Arc<Mutex<SecurityIdentity>>,
    denied: Arc<Mutex<HashSet<SecurityIdentity>>>,
    established: Arc<Mutex<Vec<SecurityIdentity>>>,
}

impl FakeSecurityPropagator {
    pub fn new(caller: SecurityIdentity) -> Self {
        Self {
            caller: Arc::new(Mutex::new(caller)),
            denied: Arc::new(Mutex::new(HashSet::new())),
            established: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Change the identity reported by `capture`
    pub fn set_caller(&self, identity: SecurityIdentity) {
        *self.caller.lock().unwrap_or_else(|e| e.into_inner()) = identity;
    }

    /// Make `run_as` fail for this identity
    pub fn deny(&self, identity: SecurityIdentity) {
        self.denied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(identity);
    }

    /// Every identity `run_as` established, in order
    pub fn established(&self) -> Vec<SecurityIdentity> {
        self.established
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for FakeSecurityPropagator {
    fn default() -> Self {
        Self::new(SecurityIdentity::system())
    }
}

impl SecurityPropagator for FakeSecurityPropagator {
    fn capture(&self) -> SecurityIdentity {
        active_identity()
            .unwrap_or_else(|| self.caller.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn run_as(
        &self,
        identity: &SecurityIdentity,
        work: &mut dyn FnMut() -> Result<(), RuleError>,
    ) -> Result<(), RuleError> {
        if self
            .denied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(identity)
        {
            return Err(RuleError::Security(format!("{} is not allowed", identity)));
        }
        self.established
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(identity.clone());

        let previous = ACTIVE.with(|active| active.replace(Some(identity.clone())));
        let result = work();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
        result
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
