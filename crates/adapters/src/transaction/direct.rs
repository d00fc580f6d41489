// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction runner for deployments without a transactional store.

use super::{CommitCallback, TransactionRunner, TransactionalWork};
use rulerun_core::RuleError;

/// Runs work directly with no transaction around it.
///
/// Commit callbacks fire immediately since there is never an outer
/// transaction to wait for.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectTransactionRunner;

impl DirectTransactionRunner {
    pub fn new() -> Self {
        Self
    }
}

impl TransactionRunner for DirectTransactionRunner {
    fn run_in_new_transaction(&self, work: TransactionalWork<'_>) -> Result<(), RuleError> {
        work()
    }

    fn on_commit(&self, callback: CommitCallback) {
        callback();
    }
}
