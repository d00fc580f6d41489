// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only view of a scheduled batch
//!
//! Status accessors are safe to call from any thread while the batch runs.
//! Every call takes a consistent copy of the batch's progress; consecutive
//! calls may observe different moments.

use rulerun_core::{EntityKey, OperationId, RuleId};
use serde::Serialize;
use std::time::Duration;

/// Lifecycle of an execution entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Accepted, waiting for a worker
    Created,
    /// A worker is popping and executing rules
    Running,
    /// Queue exhausted or cancelled; unregistered
    Done,
}

/// A rule that finished with an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRule {
    pub rule: RuleId,
    pub error: String,
}

/// Point-in-time copy of a batch's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSnapshot {
    pub id: String,
    pub entity: EntityKey,
    pub operation: OperationId,
    pub state: EntryState,
    pub cancelled: bool,
    pub pending: Vec<RuleId>,
    pub processing: Option<RuleId>,
    pub processing_elapsed_ms: Option<u64>,
    pub completed: Vec<RuleId>,
    pub failed: Vec<FailedRule>,
    /// Rules skipped because the batch was cancelled before they started
    pub abandoned: Vec<RuleId>,
}

/// Status of one scheduled batch
pub trait ExecutionStatus: Send + Sync {
    fn id(&self) -> &str;

    fn entity(&self) -> &EntityKey;

    /// Operation that triggered the batch
    fn operation(&self) -> &OperationId;

    fn state(&self) -> EntryState;

    /// Rules not yet started, in execution order
    fn pending_rules(&self) -> Vec<RuleId>;

    /// Distinct ids of rules that finished successfully
    fn completed_rules(&self) -> Vec<RuleId>;

    /// Distinct ids of rules that failed
    fn failed_rules(&self) -> Vec<RuleId>;

    /// Every failure with its error message, including repeats of one rule
    fn failures(&self) -> Vec<FailedRule>;

    fn abandoned_rules(&self) -> Vec<RuleId>;

    /// Rule currently executing, if any
    fn current_rule(&self) -> Option<RuleId>;

    /// How long the current rule has been executing
    fn current_elapsed(&self) -> Option<Duration>;

    /// No rule pending and none executing
    fn is_done(&self) -> bool;

    fn is_cancelled(&self) -> bool;

    fn snapshot(&self) -> ExecutionSnapshot;
}
