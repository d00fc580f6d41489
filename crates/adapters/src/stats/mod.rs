// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule statistics sinks
//!
//! Recording is best effort: the engine logs and ignores sink errors, so a
//! broken sink never changes a rule's outcome.

mod sinks;

pub use sinks::{NoOpStatisticsSink, TracingStatisticsSink};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStatisticsSink;

use rulerun_core::{EntityKey, OperationId, RuleId};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors from statistics sinks
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("statistics sink unavailable: {0}")]
    Unavailable(String),
}

/// How a rule finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Completed,
    Failed,
}

/// Which entry point ran the rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Background batch accepted by `schedule_rules`
    Scheduled,
    /// Caller-thread run through `run_rules`
    Immediate,
}

/// One finished rule execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleExecution {
    pub rule: RuleId,
    pub entity: EntityKey,
    pub operation: OperationId,
    pub mode: ExecutionMode,
    pub outcome: RuleOutcome,
    pub elapsed: Duration,
}

/// Receives counters and timings for finished rules
pub trait StatisticsSink: Send + Sync + 'static {
    fn record(&self, execution: &RuleExecution) -> Result<(), StatsError>;
}
