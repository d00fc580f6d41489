// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Collaborator contracts the rule engine runs against: transactions,
//! security context propagation and statistics

pub mod security;
pub mod stats;
pub mod traced;
pub mod transaction;

pub use security::{NoOpSecurityPropagator, SecurityIdentity, SecurityPropagator};
pub use stats::{
    ExecutionMode, NoOpStatisticsSink, RuleExecution, RuleOutcome, StatisticsSink, StatsError,
    TracingStatisticsSink,
};
pub use traced::{TracedSecurityPropagator, TracedTransactionRunner};
pub use transaction::{CommitCallback, DirectTransactionRunner, TransactionRunner};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use security::{active_identity, FakeSecurityPropagator};
#[cfg(any(test, feature = "test-support"))]
pub use stats::FakeStatisticsSink;
#[cfg(any(test, feature = "test-support"))]
pub use transaction::{FakeTransactionRunner, TransactionCall};
