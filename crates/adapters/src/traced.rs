// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced collaborator wrappers for consistent observability

use crate::security::{SecurityIdentity, SecurityPropagator};
use crate::transaction::{CommitCallback, TransactionRunner, TransactionalWork};
use rulerun_core::RuleError;

/// Wrapper that adds tracing to any TransactionRunner
#[derive(Clone)]
pub struct TracedTransactionRunner<T> {
    inner: T,
}

impl<T> TracedTransactionRunner<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: TransactionRunner> TransactionRunner for TracedTransactionRunner<T> {
    fn run_in_new_transaction(&self, work: TransactionalWork<'_>) -> Result<(), RuleError> {
        let span = tracing::debug_span!("transaction.run");
        let _guard = span.enter();

        let start = std::time::Instant::now();
        let result = self.inner.run_in_new_transaction(work);
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "committed"),
            Err(RuleError::Transaction(message)) => tracing::error!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %message,
                "commit failed"
            ),
            Err(e) => tracing::debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "rolled back"
            ),
        }

        result
    }

    fn on_commit(&self, callback: CommitCallback) {
        tracing::trace!("deferring callback until commit");
        self.inner.on_commit(callback);
    }
}

/// Wrapper that adds tracing to any SecurityPropagator
#[derive(Clone)]
pub struct TracedSecurityPropagator<S> {
    inner: S,
}

impl<S> TracedSecurityPropagator<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: SecurityPropagator> SecurityPropagator for TracedSecurityPropagator<S> {
    fn capture(&self) -> SecurityIdentity {
        let identity = self.inner.capture();
        tracing::trace!(identity = %identity, "captured identity");
        identity
    }

    fn run_as(
        &self,
        identity: &SecurityIdentity,
        work: &mut dyn FnMut() -> Result<(), RuleError>,
    ) -> Result<(), RuleError> {
        let span = tracing::debug_span!("security.run_as", identity = %identity);
        let _guard = span.enter();

        let result = self.inner.run_as(identity, work);
        if let Err(RuleError::Security(message)) = &result {
            tracing::warn!(error = %message, "identity could not be established");
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
