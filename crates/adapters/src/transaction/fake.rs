// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transaction runner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CommitCallback, TransactionRunner, TransactionalWork};
use rulerun_core::RuleError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Recorded transaction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionCall {
    Begin { tx: u64 },
    Commit { tx: u64 },
    Rollback { tx: u64 },
    Deferred,
}

/// Fake transaction runner that records demarcation and holds commit
/// callbacks until [`FakeTransactionRunner::commit_outer`] is called
#[derive(Clone, Default)]
pub struct FakeTransactionRunner {
    calls: Arc<Mutex<Vec<TransactionCall>>>,
    deferred: Arc<Mutex<Vec<CommitCallback>>>,
    next_tx: Arc<AtomicU64>,
    fail_next_commit: Arc<AtomicBool>,
}

impl FakeTransactionRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TransactionCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of committed transactions
    pub fn commits(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransactionCall::Commit { .. }))
            .count()
    }

    /// Number of rolled back transactions
    pub fn rollbacks(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransactionCall::Rollback { .. }))
            .count()
    }

    /// Make the next successful transaction fail at commit time
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Simulate the outer transaction committing: run every deferred
    /// callback and return how many ran
    pub fn commit_outer(&self) -> usize {
        let callbacks: Vec<CommitCallback> =
            std::mem::take(&mut *self.deferred.lock().unwrap_or_else(|e| e.into_inner()));
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }

    /// Simulate the outer transaction rolling back: drop deferred callbacks
    pub fn rollback_outer(&self) -> usize {
        let mut deferred = self.deferred.lock().unwrap_or_else(|e| e.into_inner());
        let count = deferred.len();
        deferred.clear();
        count
    }

    fn record(&self, call: TransactionCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

impl TransactionRunner for FakeTransactionRunner {
    fn run_in_new_transaction(&self, work: TransactionalWork<'_>) -> Result<(), RuleError> {
        let tx = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(TransactionCall::Begin { tx });

        match work() {
            Ok(()) if self.fail_next_commit.swap(false, Ordering::SeqCst) => {
                self.record(TransactionCall::Rollback { tx });
                Err(RuleError::Transaction(format!("commit of tx {} failed", tx)))
            }
            Ok(()) => {
                self.record(TransactionCall::Commit { tx });
                Ok(())
            }
            Err(e) => {
                self.record(TransactionCall::Rollback { tx });
                Err(e)
            }
        }
    }

    fn on_commit(&self, callback: CommitCallback) {
        self.record(TransactionCall::Deferred);
        self.deferred
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(callback);
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
