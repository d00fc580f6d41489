// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction boundary adapters

mod direct;

pub use direct::DirectTransactionRunner;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransactionRunner, TransactionCall};

use rulerun_core::RuleError;

/// Work run inside a transaction boundary
pub type TransactionalWork<'a> = &'a mut dyn FnMut() -> Result<(), RuleError>;

/// Callback deferred until the surrounding transaction commits
pub type CommitCallback = Box<dyn FnOnce() + Send + 'static>;

/// Owns transaction demarcation for rule execution
pub trait TransactionRunner: Send + Sync + 'static {
    /// Run `work` in a fresh transaction, committing on `Ok` and rolling
    /// back on `Err`. A failed commit is reported as
    /// [`RuleError::Transaction`].
    fn run_in_new_transaction(&self, work: TransactionalWork<'_>) -> Result<(), RuleError>;

    /// Run `callback` once the caller's current transaction commits. Runners
    /// without an active transaction run it immediately.
    fn on_commit(&self, callback: CommitCallback);
}
